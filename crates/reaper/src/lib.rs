//! # The Reaper: Quarantine and Staging
//!
//! Owns every file the service moves or deletes on the user's behalf:
//! - [`Quarantine`]: isolates artifacts, restores them, deletes them for good.
//! - [`StagedFile`]: uploads parked on disk for one operation, removed on drop.

pub mod quarantine;
pub mod staging;

pub use quarantine::Quarantine;
pub use staging::StagedFile;

use std::path::PathBuf;

/// Errors from reaper operations.
#[derive(Debug, thiserror::Error)]
pub enum ReaperError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger error: {0}")]
    Vault(#[from] vault::VaultError),
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("refusing to overwrite existing file {}", .0.display())]
    RestoreConflict(PathBuf),
}
