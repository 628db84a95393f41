//! Staged uploads: request bodies written to local storage for the duration
//! of one operation.
//!
//! A [`StagedFile`] owns its path. It is removed by [`StagedFile::discard`] or,
//! failing that, when the value is dropped, so an early return or a panic
//! can never leave a staged upload behind.

use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    name: String,
    armed: bool,
}

impl StagedFile {
    /// Writes `bytes` into `dir` under a collision-free name derived from `name`.
    pub async fn write(dir: &Path, name: &str, bytes: &[u8]) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let name = display_name(name);
        let path = dir.join(format!("{}_{}", Uuid::new_v4().simple(), name));
        // Armed before the write so a partial file is cleaned up too.
        let staged = Self {
            path,
            name,
            armed: true,
        };
        tokio::fs::write(&staged.path, bytes).await?;
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The caller-facing name (no directory components).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Removes the file now.
    pub async fn discard(mut self) {
        self.armed = false;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            log_removal_failure(&self.path, &e);
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                log_removal_failure(&self.path, &e);
            }
        }
    }
}

fn log_removal_failure(path: &Path, e: &io::Error) {
    if e.kind() != io::ErrorKind::NotFound {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove staged upload");
    }
}

/// Last path component of a client-supplied name, so uploads cannot escape `dir`.
fn display_name(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .find(|part| !part.is_empty() && *part != "." && *part != "..")
        .unwrap_or("upload")
        .to_string()
}
