//! # The Anatomist: Local Secret Inspection
//!
//! **Role**: dissects uploaded text for leaked credentials without ever
//! contacting the reputation oracle.
//!
//! **Core Types**:
//! - `RuleSet`: ordered, named regular expressions compiled into one `RegexSet`.
//! - `ExclusionSet`: enabled path-exclusion rules compiled into one Aho-Corasick automaton.
//! - `BatchFile` / `BatchReport`: input and output of [`scan_batch`].
//!
//! **Design**:
//! - Matching is line-oriented; findings carry 1-based line numbers.
//! - Any NUL byte marks content as binary and skips it.
//! - False positives are accepted: candidates are never validated semantically.

pub mod batch;
pub mod exclusion;
pub mod matcher;
pub mod rules;

pub use batch::{scan_batch, BatchContent, BatchFile, BatchReport};
pub use exclusion::{default_exclusions, set_label_enabled, ExclusionRule, ExclusionSet};
pub use matcher::{is_binary, scan_bytes, scan_text};
pub use rules::RuleSet;

/// Errors from building rules or exclusion sets. Scanning itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("invalid rule `{name}`: {reason}")]
    InvalidRule { name: String, reason: String },
    #[error("exclusion automaton build failed: {0}")]
    Exclusion(String),
}
