//! Physical isolation of suspicious artifacts.
//!
//! ## Workflow
//! 1. `isolate(path, reason)` moves the file into the quarantine directory as
//!    `{ts}_{id8}_{filename}`.
//! 2. Only after the move succeeds is the record appended to the ledger.
//! 3. If that ledger write fails, the file is moved back so neither side
//!    reflects a half-done isolation.
//! 4. `restore(id)` is the inverse: move back, then drop the record.
//!
//! Moves try `rename` first and fall back to copy + remove when the
//! quarantine directory lives on another filesystem.

use crate::ReaperError;
use chrono::Utc;
use common::{NewQuarantineEntry, QuarantineEntry, RecordKind};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use vault::Ledger;

pub struct Quarantine {
    dir: PathBuf,
    ledger: Arc<Ledger>,
}

impl Quarantine {
    /// Creates (or reuses) `dir` as the isolation area.
    pub fn new(dir: impl Into<PathBuf>, ledger: Arc<Ledger>) -> Result<Self, ReaperError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, ledger })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn list(&self) -> Result<Vec<QuarantineEntry>, ReaperError> {
        Ok(self.ledger.quarantine()?)
    }

    /// Moves `file_path` into isolation and records it.
    pub fn isolate(&self, file_path: &Path, reason: &str) -> Result<QuarantineEntry, ReaperError> {
        let meta = fs::metadata(file_path)?;
        if !meta.is_file() {
            return Err(ReaperError::NotAFile(file_path.to_path_buf()));
        }
        let original = dunce::canonicalize(file_path)?;
        let file_name = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());

        let id8 = Uuid::new_v4().simple().to_string();
        let dest = self.dir.join(format!(
            "{}_{}_{}",
            Utc::now().timestamp_millis(),
            &id8[..8],
            file_name
        ));

        move_file(&original, &dest)?;

        let record = NewQuarantineEntry {
            original_path: original.display().to_string(),
            quarantine_path: dest.display().to_string(),
            file_name,
            reason: reason.to_string(),
        };
        match self.ledger.append_quarantine(record) {
            Ok(entry) => {
                tracing::info!(id = %entry.id, from = %entry.original_path, "artifact quarantined");
                Ok(entry)
            }
            Err(e) => {
                if let Err(rollback) = move_file(&dest, &original) {
                    tracing::error!(
                        artifact = %dest.display(),
                        error = %rollback,
                        "quarantine rollback failed; artifact left in isolation without a record"
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Moves an artifact back to where it came from and forgets the record.
    /// Refuses to overwrite a file that has since appeared at the original path.
    pub fn restore(&self, id: Uuid) -> Result<QuarantineEntry, ReaperError> {
        let entry = self.ledger.quarantine_entry(id)?;
        let original = PathBuf::from(&entry.original_path);
        let isolated = PathBuf::from(&entry.quarantine_path);

        if original.exists() {
            return Err(ReaperError::RestoreConflict(original));
        }
        if let Some(parent) = original.parent() {
            fs::create_dir_all(parent)?;
        }
        move_file(&isolated, &original)?;

        match self.ledger.release_quarantine(id) {
            Ok(entry) => {
                tracing::info!(%id, to = %entry.original_path, "artifact restored");
                Ok(entry)
            }
            Err(e) => {
                if let Err(rollback) = move_file(&original, &isolated) {
                    tracing::error!(%id, error = %rollback, "restore rollback failed");
                }
                Err(e.into())
            }
        }
    }

    /// Permanently deletes the artifact and its record.
    pub fn delete(&self, id: Uuid) -> Result<(), ReaperError> {
        Ok(self.ledger.remove(id, RecordKind::Quarantine)?)
    }
}

/// `rename`, or copy + remove when the two paths are on different filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(rename_err) => {
            tracing::debug!(error = %rename_err, "rename failed, copying across filesystems");
            fs::copy(from, to)?;
            if let Err(e) = fs::remove_file(from) {
                let _ = fs::remove_file(to);
                return Err(e);
            }
            Ok(())
        }
    }
}
