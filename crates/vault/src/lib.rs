//! # The Vault: Audit Ledger
//!
//! Durable, newest-first record of every scan/monitor operation and every
//! quarantined artifact.
//!
//! ## Storage model
//! 1. A [`LedgerStore`] loads and saves the whole [`LedgerSnapshot`] at once.
//! 2. Every [`Ledger`] mutation is load → change → save. Nothing is appended
//!    incrementally.
//! 3. One `Ledger` serializes its own writers. Two processes (or two `Ledger`
//!    values) sharing one store file still race, and the last save wins.

pub mod ledger;
pub mod store;

pub use ledger::Ledger;
pub use store::{JsonFileStore, LedgerSnapshot, LedgerStore, MemoryStore};

use common::RecordKind;
use uuid::Uuid;

/// Errors from ledger storage.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("no {kind:?} record with id {id}")]
    NotFound { kind: RecordKind, id: Uuid },
}
