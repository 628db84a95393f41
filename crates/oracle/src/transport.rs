//! The seam between the gateway and the remote reputation service.

use crate::OracleError;
use async_trait::async_trait;
use bytes::Bytes;
use common::{AnalysisHandle, Fingerprint, Verdict};
use serde::Deserialize;

/// Outcome of a fingerprint lookup. Callers switch on the tag, never on HTTP codes.
#[derive(Debug)]
pub enum Lookup {
    /// The oracle already has a verdict for this content.
    Found(Verdict),
    /// The oracle has never seen this content.
    NotFound,
    /// Anything else: auth, network, rate limit, malformed response.
    TransportError(OracleError),
}

/// Lifecycle of a queued analysis as the oracle reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStatus {
    Queued,
    InProgress,
    Completed,
    #[serde(other)]
    Unknown,
}

/// One poll response. `verdict` is only meaningful when `status` is `Completed`.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub status: AnalysisStatus,
    pub verdict: Verdict,
}

/// The remote reputation service.
///
/// Implementations perform exactly one remote round trip per call and never
/// retry on their own.
#[async_trait]
pub trait ReputationOracle: Send + Sync {
    async fn lookup(&self, fingerprint: &Fingerprint) -> Lookup;

    /// Uploads raw content for analysis.
    async fn submit(&self, file_name: &str, content: Bytes) -> Result<AnalysisHandle, OracleError>;

    async fn analysis(&self, handle: &AnalysisHandle) -> Result<AnalysisReport, OracleError>;

    /// Queues a URL for reputation analysis.
    async fn submit_url(&self, url: &str) -> Result<AnalysisHandle, OracleError>;
}
