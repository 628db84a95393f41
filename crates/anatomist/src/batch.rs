//! Batch Coordinator: fan the matcher out across an uploaded file set.
//!
//! Per file: exclusion check → read (inline buffer, staged upload via mmap, or
//! external file via a plain read) → matcher. Files are processed in parallel
//! on the rayon pool; the output order always follows the input order.
//!
//! A file that cannot be read contributes nothing and is counted in
//! `files_skipped`; it never aborts the batch. No oracle lookups happen here.

use crate::exclusion::ExclusionSet;
use crate::matcher::scan_bytes;
use crate::rules::RuleSet;
use common::{BatchSummary, FileFindings, Finding};
use memmap2::Mmap;
use rayon::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Where a batch member's bytes come from.
#[derive(Debug, Clone)]
pub enum BatchContent {
    Inline(Vec<u8>),
    /// A private upload copy in the uploads dir. Mapped read-only.
    Staged(PathBuf),
    /// A file in a tree other processes may edit or truncate. Read into memory.
    External(PathBuf),
}

/// One batch member: the caller-facing relative path plus its content.
#[derive(Debug, Clone)]
pub struct BatchFile {
    pub path: String,
    pub content: BatchContent,
}

impl BatchFile {
    pub fn inline(path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: BatchContent::Inline(bytes.into()),
        }
    }

    pub fn staged(path: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content: BatchContent::Staged(location.into()),
        }
    }

    pub fn external(path: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content: BatchContent::External(location.into()),
        }
    }
}

/// Result of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Only files with at least one finding, in input order.
    #[serde(rename = "results")]
    pub findings: Vec<FileFindings>,
    pub summary: BatchSummary,
}

enum FileOutcome {
    Excluded,
    Unreadable,
    Scanned(Vec<Finding>),
}

/// Scans every non-excluded file in `files` against `rules`.
pub fn scan_batch(files: &[BatchFile], rules: &RuleSet, exclusions: &ExclusionSet) -> BatchReport {
    let outcomes: Vec<FileOutcome> = files
        .par_iter()
        .map(|file| scan_member(file, rules, exclusions))
        .collect();

    let mut report = BatchReport::default();
    for (file, outcome) in files.iter().zip(outcomes) {
        match outcome {
            FileOutcome::Excluded => report.summary.files_excluded += 1,
            FileOutcome::Unreadable => report.summary.files_skipped += 1,
            FileOutcome::Scanned(issues) => {
                report.summary.files_scanned += 1;
                report.summary.secrets_found += issues.len();
                if let Some(grouped) = FileFindings::new(file.path.clone(), issues) {
                    report.findings.push(grouped);
                }
            }
        }
    }

    tracing::debug!(
        scanned = report.summary.files_scanned,
        excluded = report.summary.files_excluded,
        skipped = report.summary.files_skipped,
        secrets = report.summary.secrets_found,
        "batch complete"
    );
    report
}

fn scan_member(file: &BatchFile, rules: &RuleSet, exclusions: &ExclusionSet) -> FileOutcome {
    if exclusions.is_excluded(&file.path) {
        return FileOutcome::Excluded;
    }

    match &file.content {
        BatchContent::Inline(bytes) => FileOutcome::Scanned(scan_bytes(&file.path, bytes, rules)),
        BatchContent::Staged(location) => match map_file(location) {
            Ok(Some(mmap)) => FileOutcome::Scanned(scan_bytes(&file.path, &mmap, rules)),
            Ok(None) => FileOutcome::Scanned(Vec::new()),
            Err(e) => {
                tracing::warn!(path = %file.path, error = %e, "skipping unreadable file");
                FileOutcome::Unreadable
            }
        },
        BatchContent::External(location) => match fs::read(location) {
            Ok(bytes) => FileOutcome::Scanned(scan_bytes(&file.path, &bytes, rules)),
            Err(e) => {
                tracing::warn!(path = %file.path, error = %e, "skipping unreadable file");
                FileOutcome::Unreadable
            }
        },
    }
}

/// Maps a file read-only. Empty files yield `None` (nothing to map).
fn map_file(location: &Path) -> io::Result<Option<Mmap>> {
    let file = File::open(location)?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    // SAFETY: staged uploads live in the private uploads dir under a random
    // name and are only removed after the batch returns. Nothing else writes
    // to them while mapped.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(Some(mmap))
}
