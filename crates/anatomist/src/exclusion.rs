//! Path exclusion rules, kept as data.
//!
//! Each enabled rule contributes the pattern `<substring>/`; a path is excluded
//! when any pattern occurs anywhere in its slash-normalized form. All enabled
//! patterns are compiled into one Aho-Corasick automaton, so the check is a
//! single pass over the path regardless of how many rules are enabled.

use crate::MatcherError;
use aho_corasick::AhoCorasick;
use serde::{Deserialize, Serialize};

/// One exclusion predicate. Several rules may share a label and toggle together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub label: String,
    pub enabled: bool,
    pub substring: String,
}

impl ExclusionRule {
    pub fn new(label: impl Into<String>, substring: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            substring: substring.into(),
        }
    }
}

/// Dependency, VCS, virtualenv and build-output directories, all enabled.
pub fn default_exclusions() -> Vec<ExclusionRule> {
    [
        ("node_modules", "node_modules"),
        ("git", ".git"),
        ("venv", ".venv"),
        ("venv", "venv"),
        ("venv", "env"),
        ("dist", "dist"),
        ("dist", "build"),
    ]
    .into_iter()
    .map(|(label, sub)| ExclusionRule::new(label, sub))
    .collect()
}

/// Enables or disables every rule carrying `label`. Returns how many rules changed state.
pub fn set_label_enabled(rules: &mut [ExclusionRule], label: &str, enabled: bool) -> usize {
    let mut changed = 0;
    for rule in rules.iter_mut().filter(|r| r.label == label) {
        if rule.enabled != enabled {
            rule.enabled = enabled;
            changed += 1;
        }
    }
    changed
}

/// Compiled form of the enabled rules.
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    automaton: Option<AhoCorasick>,
}

impl ExclusionSet {
    /// Compiles the enabled subset of `rules`. Disabled and empty rules are ignored.
    pub fn new(rules: &[ExclusionRule]) -> Result<Self, MatcherError> {
        let patterns: Vec<String> = rules
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.substring.trim_matches('/'))
            .filter(|s| !s.is_empty())
            .map(|s| format!("{s}/"))
            .collect();

        if patterns.is_empty() {
            return Ok(Self { automaton: None });
        }

        let automaton =
            AhoCorasick::new(&patterns).map_err(|e| MatcherError::Exclusion(e.to_string()))?;
        Ok(Self {
            automaton: Some(automaton),
        })
    }

    /// An exclusion set that lets every path through.
    pub fn none() -> Self {
        Self { automaton: None }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        match &self.automaton {
            None => false,
            Some(ac) => ac.is_match(&path.replace('\\', "/")),
        }
    }
}
