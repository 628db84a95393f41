//! Reputation Gateway: fingerprint → lookup → submit-on-miss.
//!
//! ## Workflow
//! 1. Digest the file with `forge` (streaming, off the async runtime).
//! 2. `lookup` by fingerprint. `Found` resolves immediately.
//! 3. `NotFound` uploads the raw bytes and returns the oracle's analysis handle.
//! 4. `TransportError` propagates untouched; it is never read as resolved or pending.
//!
//! Staged uploads handed over as [`StagedFile`] are removed when the round trip
//! ends, whichever branch it took.

use crate::poll::AnalysisSource;
use crate::transport::{AnalysisStatus, Lookup, ReputationOracle};
use crate::OracleError;
use async_trait::async_trait;
use bytes::Bytes;
use common::{AnalysisHandle, Fingerprint, Verdict};
use reaper::StagedFile;
use std::path::Path;
use std::sync::Arc;

/// Uniform result of [`ReputationGateway::lookup_or_submit`].
#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved {
        fingerprint: Fingerprint,
        verdict: Verdict,
    },
    Pending {
        fingerprint: Fingerprint,
        handle: AnalysisHandle,
    },
}

impl Resolution {
    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            Resolution::Resolved { fingerprint, .. } | Resolution::Pending { fingerprint, .. } => {
                fingerprint
            }
        }
    }
}

/// Result of one poll round trip.
#[derive(Debug, Clone)]
pub enum PollStatus {
    Pending,
    Resolved(Verdict),
    Failed(String),
}

#[derive(Clone)]
pub struct ReputationGateway {
    oracle: Arc<dyn ReputationOracle>,
}

impl ReputationGateway {
    pub fn new(oracle: Arc<dyn ReputationOracle>) -> Self {
        Self { oracle }
    }

    /// Resolves a staged upload and deletes it afterwards, on success and on error.
    pub async fn lookup_or_submit_staged(
        &self,
        staged: StagedFile,
    ) -> Result<Resolution, OracleError> {
        let result = self.lookup_or_submit(staged.path(), staged.name()).await;
        staged.discard().await;
        result
    }

    /// Resolves a file in place. The file itself is left untouched.
    pub async fn lookup_or_submit(
        &self,
        path: &Path,
        name: &str,
    ) -> Result<Resolution, OracleError> {
        let fingerprint = forge::digest_file_async(path.to_path_buf()).await?;

        match self.oracle.lookup(&fingerprint).await {
            Lookup::Found(verdict) => {
                tracing::info!(%fingerprint, "oracle already knows this content");
                Ok(Resolution::Resolved {
                    fingerprint,
                    verdict,
                })
            }
            Lookup::NotFound => {
                let content = tokio::fs::read(path).await?;
                let handle = self.oracle.submit(name, Bytes::from(content)).await?;
                tracing::info!(%fingerprint, analysis = %handle, "content submitted for analysis");
                Ok(Resolution::Pending {
                    fingerprint,
                    handle,
                })
            }
            Lookup::TransportError(e) => {
                tracing::warn!(%fingerprint, error = %e, "oracle lookup failed");
                Err(e)
            }
        }
    }

    /// One re-query of a pending analysis. Only a `completed` status yields a verdict.
    pub async fn poll(&self, handle: &AnalysisHandle) -> PollStatus {
        match self.oracle.analysis(handle).await {
            Ok(report) if report.status == AnalysisStatus::Completed => {
                PollStatus::Resolved(report.verdict)
            }
            Ok(_) => PollStatus::Pending,
            Err(e) => PollStatus::Failed(e.to_string()),
        }
    }
}

#[async_trait]
impl AnalysisSource for ReputationGateway {
    async fn poll(&self, handle: &AnalysisHandle) -> PollStatus {
        ReputationGateway::poll(self, handle).await
    }
}
