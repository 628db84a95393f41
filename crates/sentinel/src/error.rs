//! The service-level error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use oracle::OracleError;
use reaper::ReaperError;
use serde_json::json;
use vault::VaultError;
use watchtower::MonitorError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid request input. Never recorded in the ledger.
    #[error("{0}")]
    InputError(String),

    /// Network, auth or rate-limit failure talking to the reputation service.
    #[error("{0}")]
    OracleUnavailable(String),

    /// The poll budget ran out before the analysis completed.
    #[error("analysis {analysis_id} still pending after {attempts} polls")]
    PollTimeout { analysis_id: String, attempts: u32 },

    /// Ledger read/write or quarantine file-move failure.
    #[error("{0}")]
    StorageError(String),

    #[error("{0}")]
    NotFound(String),

    /// The monitored site could not be reached.
    #[error("{0}")]
    MonitorFailed(String),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InputError(_) => StatusCode::BAD_REQUEST,
            Self::OracleUnavailable(_) | Self::MonitorFailed(_) => StatusCode::BAD_GATEWAY,
            Self::PollTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::InputError(_) => "Invalid request",
            Self::OracleUnavailable(_) => "Reputation service unavailable",
            Self::PollTimeout { .. } => "Analysis timed out",
            Self::StorageError(_) => "Storage failure",
            Self::NotFound(_) => "Not found",
            Self::MonitorFailed(_) => "Failed to monitor URL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = json!({ "error": self.label(), "details": self.to_string() });
        (status, Json(body)).into_response()
    }
}

impl From<OracleError> for ApiError {
    fn from(e: OracleError) -> Self {
        match e {
            OracleError::Io(io) => Self::StorageError(format!("staged upload: {io}")),
            other => Self::OracleUnavailable(other.to_string()),
        }
    }
}

impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::NotFound { .. } => Self::NotFound(e.to_string()),
            other => Self::StorageError(other.to_string()),
        }
    }
}

impl From<ReaperError> for ApiError {
    fn from(e: ReaperError) -> Self {
        match e {
            ReaperError::Vault(v) => v.into(),
            ReaperError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                Self::NotFound(format!("file not found: {io}"))
            }
            ReaperError::NotAFile(_) | ReaperError::RestoreConflict(_) => {
                Self::InputError(e.to_string())
            }
            ReaperError::Io(io) => Self::StorageError(io.to_string()),
        }
    }
}

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        match e {
            MonitorError::InvalidUrl { .. } => Self::InputError(e.to_string()),
            MonitorError::Fetch { .. } => Self::MonitorFailed(e.to_string()),
        }
    }
}
