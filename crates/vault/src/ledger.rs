//! Append / list / remove over a [`LedgerStore`].

use crate::store::{LedgerSnapshot, LedgerStore};
use crate::VaultError;
use chrono::Utc;
use common::{LedgerEntry, NewLedgerEntry, NewQuarantineEntry, QuarantineEntry, RecordKind};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    writer: Mutex<()>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    /// Stamps `entry` with a fresh id and the current time and puts it first.
    pub fn append_history(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, VaultError> {
        let stamped = entry.stamp(Uuid::new_v4(), Utc::now());
        self.mutate(|snap| {
            snap.history.insert(0, stamped.clone());
            Ok(())
        })?;
        tracing::debug!(
            id = %stamped.id,
            kind = ?stamped.kind,
            status = ?stamped.status,
            "ledger entry appended"
        );
        Ok(stamped)
    }

    pub fn append_quarantine(
        &self,
        entry: NewQuarantineEntry,
    ) -> Result<QuarantineEntry, VaultError> {
        let stamped = entry.stamp(Uuid::new_v4(), Utc::now());
        self.mutate(|snap| {
            snap.quarantine.insert(0, stamped.clone());
            Ok(())
        })?;
        Ok(stamped)
    }

    /// Scan history, newest first.
    pub fn history(&self) -> Result<Vec<LedgerEntry>, VaultError> {
        Ok(self.store.load()?.history)
    }

    /// Quarantine registry, newest first.
    pub fn quarantine(&self) -> Result<Vec<QuarantineEntry>, VaultError> {
        Ok(self.store.load()?.quarantine)
    }

    pub fn quarantine_entry(&self, id: Uuid) -> Result<QuarantineEntry, VaultError> {
        self.quarantine()?
            .into_iter()
            .find(|q| q.id == id)
            .ok_or(VaultError::NotFound {
                kind: RecordKind::Quarantine,
                id,
            })
    }

    /// Deletes a record. For quarantine records the isolated artifact is
    /// deleted first; an artifact that is already gone does not block removal.
    pub fn remove(&self, id: Uuid, kind: RecordKind) -> Result<(), VaultError> {
        self.mutate(|snap| match kind {
            RecordKind::HistoryLog => {
                let pos = snap
                    .history
                    .iter()
                    .position(|e| e.id == id)
                    .ok_or(VaultError::NotFound { kind, id })?;
                snap.history.remove(pos);
                Ok(())
            }
            RecordKind::Quarantine => {
                let pos = snap
                    .quarantine
                    .iter()
                    .position(|q| q.id == id)
                    .ok_or(VaultError::NotFound { kind, id })?;
                remove_artifact(Path::new(&snap.quarantine[pos].quarantine_path))?;
                snap.quarantine.remove(pos);
                Ok(())
            }
        })?;
        tracing::info!(%id, ?kind, "ledger record removed");
        Ok(())
    }

    /// Drops a quarantine record without touching the artifact (used once the
    /// artifact has been moved back to its original location).
    pub fn release_quarantine(&self, id: Uuid) -> Result<QuarantineEntry, VaultError> {
        self.mutate(|snap| {
            let pos = snap
                .quarantine
                .iter()
                .position(|q| q.id == id)
                .ok_or(VaultError::NotFound {
                    kind: RecordKind::Quarantine,
                    id,
                })?;
            Ok(snap.quarantine.remove(pos))
        })
    }

    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut LedgerSnapshot) -> Result<T, VaultError>,
    ) -> Result<T, VaultError> {
        let _guard = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        let mut snapshot = self.store.load()?;
        let out = change(&mut snapshot)?;
        self.store.save(&snapshot)?;
        Ok(out)
    }
}

fn remove_artifact(path: &Path) -> Result<(), VaultError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "quarantined artifact already absent");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
