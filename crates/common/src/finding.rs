//! Results of local pattern scanning.

use serde::{Deserialize, Serialize};

/// One rule firing on one line of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Rule name from the ruleset (e.g. `"AWS Access Key"`).
    pub rule: String,
    pub path: String,
    /// 1-based line number.
    pub line: usize,
    /// The matched line, verbatim.
    pub content: String,
}

/// Findings grouped per file. Files with zero findings are never reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFindings {
    pub path: String,
    /// `"Detected: <rule>, <rule>"` with each distinct rule once, in first-seen order.
    pub details: String,
    pub issues: Vec<Finding>,
}

impl FileFindings {
    /// Groups `issues` under `path`. Returns `None` when there is nothing to report.
    pub fn new(path: impl Into<String>, issues: Vec<Finding>) -> Option<Self> {
        if issues.is_empty() {
            return None;
        }
        let mut rules: Vec<&str> = Vec::new();
        for f in &issues {
            if !rules.contains(&f.rule.as_str()) {
                rules.push(&f.rule);
            }
        }
        let details = format!("Detected: {}", rules.join(", "));
        Some(Self {
            path: path.into(),
            details,
            issues,
        })
    }
}

/// Aggregate counters for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Files that passed exclusion and were read.
    pub files_scanned: usize,
    /// Total number of findings across all files.
    pub secrets_found: usize,
    pub files_excluded: usize,
    /// Files that could not be read.
    pub files_skipped: usize,
}
