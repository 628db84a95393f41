//! Immutable ledger records.
//!
//! Callers build a `NewLedgerEntry` / `NewQuarantineEntry`; the ledger assigns
//! the id and timestamp when it appends, so no caller can forge either.

use crate::{Fingerprint, Verdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which operation produced a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanKind {
    FileScan,
    ProjectScan,
    WebMonitor,
}

/// Outcome bucket recorded for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    Safe,
    /// Local heuristics fired (secrets, missing headers); nothing confirmed malicious.
    Warning,
    /// The oracle flagged the content.
    Threat,
    /// The operation failed; recorded to keep the audit trail complete.
    Error,
}

impl LedgerStatus {
    pub fn from_verdict(verdict: &Verdict) -> Self {
        if verdict.is_threat() {
            Self::Threat
        } else {
            Self::Safe
        }
    }

    /// `Warning` when anything was found, `Safe` otherwise.
    pub fn from_issue_count(count: usize) -> Self {
        if count > 0 {
            Self::Warning
        } else {
            Self::Safe
        }
    }
}

/// Selects one of the two ledger sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Quarantine,
    HistoryLog,
}

/// A ledger entry before the ledger has stamped it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub kind: ScanKind,
    pub target: String,
    pub status: LedgerStatus,
    pub details: String,
    pub hash: Option<Fingerprint>,
    pub verdict: Option<Verdict>,
}

impl NewLedgerEntry {
    pub fn new(
        kind: ScanKind,
        target: impl Into<String>,
        status: LedgerStatus,
        details: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            status,
            details: details.into(),
            hash: None,
            verdict: None,
        }
    }

    pub fn with_hash(mut self, hash: Fingerprint) -> Self {
        self.hash = Some(hash);
        self
    }

    pub fn with_verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = Some(verdict);
        self
    }

    pub fn stamp(self, id: Uuid, timestamp: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id,
            timestamp,
            kind: self.kind,
            target: self.target,
            status: self.status,
            details: self.details,
            hash: self.hash,
            verdict: self.verdict,
        }
    }
}

/// One completed scan or monitor operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ScanKind,
    pub target: String,
    pub status: LedgerStatus,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

/// A quarantine record before the ledger has stamped it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuarantineEntry {
    pub original_path: String,
    pub quarantine_path: String,
    pub file_name: String,
    pub reason: String,
}

impl NewQuarantineEntry {
    pub fn stamp(self, id: Uuid, timestamp: DateTime<Utc>) -> QuarantineEntry {
        QuarantineEntry {
            id,
            timestamp,
            original_path: self.original_path,
            quarantine_path: self.quarantine_path,
            file_name: self.file_name,
            reason: self.reason,
        }
    }
}

/// An artifact physically isolated from its original location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub original_path: String,
    pub quarantine_path: String,
    pub file_name: String,
    pub reason: String,
}
