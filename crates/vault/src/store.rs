//! Whole-snapshot persistence behind the `{load, save}` seam.

use crate::VaultError;
use common::{LedgerEntry, QuarantineEntry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// The complete persisted state. Both sequences are kept newest-first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub history: Vec<LedgerEntry>,
    #[serde(default)]
    pub quarantine: Vec<QuarantineEntry>,
}

pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<LedgerSnapshot, VaultError>;
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), VaultError>;
}

/// Single JSON file holding `{history: [...], quarantine: [...]}`.
///
/// Saves write a sibling temp file and rename it over the store, so readers
/// never observe a half-written file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Opens `path`, creating it (and its parent directory) with empty arrays if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let store = Self { path: path.into() };
        if let Some(parent) = store.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if !store.path.exists() {
            store.save(&LedgerSnapshot::default())?;
            tracing::info!(path = %store.path.display(), "created empty ledger store");
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<LedgerSnapshot, VaultError> {
        let raw = fs::read(&self.path)?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(LedgerSnapshot::default());
        }
        Ok(serde_json::from_slice(&raw)?)
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), VaultError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<LedgerSnapshot>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `save` fail with an I/O error (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerSnapshot> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<LedgerSnapshot, VaultError> {
        Ok(self.lock().clone())
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), VaultError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(VaultError::Io(std::io::Error::other("store is read-only")));
        }
        *self.lock() = snapshot.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{LedgerStatus, NewLedgerEntry, ScanKind};
    use uuid::Uuid;

    fn snapshot_with_one() -> LedgerSnapshot {
        LedgerSnapshot {
            history: vec![NewLedgerEntry::new(
                ScanKind::FileScan,
                "a.txt",
                LedgerStatus::Safe,
                "clean",
            )
            .stamp(Uuid::new_v4(), Utc::now())],
            quarantine: Vec::new(),
        }
    }

    #[test]
    fn test_open_creates_empty_store() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("ledger.json");
        let store = JsonFileStore::open(&path).unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"history": [], "quarantine": []}));
        assert_eq!(store.load().unwrap(), LedgerSnapshot::default());
    }

    #[test]
    fn test_save_then_load_through_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ledger.json");
        let snapshot = snapshot_with_one();

        JsonFileStore::open(&path).unwrap().save(&snapshot).unwrap();
        // a fresh handle sees what the first one wrote
        let loaded = JsonFileStore::open(&path).unwrap().load().unwrap();
        assert_eq!(loaded, snapshot);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ledger.json");
        fs::write(&path, br#"{"history": []}"#).unwrap();
        let loaded = JsonFileStore::open(&path).unwrap().load().unwrap();
        assert!(loaded.quarantine.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ledger.json");
        fs::write(&path, b"{not json").unwrap();
        let err = JsonFileStore::open(&path).unwrap().load().unwrap_err();
        assert!(matches!(err, VaultError::Corrupt(_)));
    }

    #[test]
    fn test_memory_store_failure_toggle() {
        let store = MemoryStore::new();
        store.set_fail_saves(true);
        assert!(store.save(&snapshot_with_one()).is_err());
        assert!(store.load().unwrap().history.is_empty());

        store.set_fail_saves(false);
        store.save(&snapshot_with_one()).unwrap();
        assert_eq!(store.load().unwrap().history.len(), 1);
    }
}
