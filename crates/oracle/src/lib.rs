//! # The Oracle: Remote Reputation Gateway
//!
//! **Role**: everything that talks to the external reputation service.
//!
//! **Core Types**:
//! - [`ReputationOracle`]: one-round-trip-per-call transport seam.
//! - [`VirusTotalClient`]: the production transport (VirusTotal v3).
//! - [`ReputationGateway`]: fingerprint lookup, submission on miss, staged-file cleanup.
//! - [`PollCoordinator`] / [`PollTask`]: cancellable `PENDING -> terminal` polling.
//!
//! **Design**:
//! - Lookups return a tagged [`Lookup`]; no caller ever inspects an HTTP status.
//! - The gateway never retries. Bounded re-polling of pending analyses is the
//!   coordinator's job and nothing else's.

pub mod gateway;
pub mod poll;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;
pub mod virustotal;

pub use gateway::{PollStatus, ReputationGateway, Resolution};
pub use poll::{AnalysisSource, PollConfig, PollCoordinator, PollOutcome, PollTask};
pub use transport::{AnalysisReport, AnalysisStatus, Lookup, ReputationOracle};
pub use virustotal::{VirusTotalClient, DEFAULT_BASE_URL};

/// Errors talking to the reputation service.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle rejected the API key")]
    Unauthorized,
    #[error("oracle rate limit exceeded")]
    RateLimited,
    #[error("oracle transport failure: {0}")]
    Transport(String),
    #[error("unexpected oracle response: {0}")]
    Protocol(String),
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
}
