//! # Common: Shared Scan Data Model
//!
//! Types that cross crate boundaries: content fingerprints, oracle verdicts,
//! pattern findings and the immutable ledger records that the `vault` persists.
//!
//! All public types derive `serde` traits. Field names serialize in
//! `camelCase` because the JSON store file and the HTTP API share this shape.

pub mod finding;
pub mod record;
pub mod verdict;

pub use finding::{BatchSummary, FileFindings, Finding};
pub use record::{
    LedgerEntry, LedgerStatus, NewLedgerEntry, NewQuarantineEntry, QuarantineEntry, RecordKind,
    ScanKind,
};
pub use verdict::{Classification, DetectionStats, EngineResult, Verdict};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a hex-encoded SHA-256 digest.
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Errors from parsing externally supplied fingerprints.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("fingerprint must be {FINGERPRINT_HEX_LEN} hex characters, got {0}")]
    BadLength(usize),
    #[error("fingerprint contains non-hex character {0:?}")]
    NotHex(char),
}

/// Hex-encoded content digest. Identical bytes always yield the identical value.
///
/// Used both as the oracle lookup key and as the dedup key. Always stored in
/// lowercase so that equality is byte equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps raw digest bytes.
    pub fn from_digest(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Validates and normalizes a hex string (e.g. one echoed back by the oracle).
    ///
    /// # Examples
    /// ```
    /// # use common::Fingerprint;
    /// let hex = "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855";
    /// let fp = Fingerprint::parse(hex).unwrap();
    /// assert_eq!(fp.as_str(), hex.to_ascii_lowercase());
    /// ```
    pub fn parse(hex: &str) -> Result<Self, FingerprintError> {
        if hex.len() != FINGERPRINT_HEX_LEN {
            return Err(FingerprintError::BadLength(hex.len()));
        }
        if let Some(c) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(FingerprintError::NotHex(c));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier the oracle issues for a queued analysis. Never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisHandle(String);

impl AnalysisHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnalysisHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
