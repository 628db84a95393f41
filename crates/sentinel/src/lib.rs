//! # The Sentinel: Scan Orchestration Service
//!
//! **Role**: the single entry point behind both the HTTP API and the CLI.
//!
//! **Core Types**:
//! - [`ScanService`]: file scans, project scans, URL monitoring, ledger and
//!   quarantine operations. Writes exactly one ledger entry per completed operation.
//! - [`ApiError`]: the service error taxonomy and its HTTP status mapping.
//! - [`Settings`]: data directory layout, oracle endpoint, poll budget.
//!
//! The axum router lives in [`api`]; `api::serve` runs it.

pub mod api;
pub mod error;
pub mod service;
pub mod settings;

pub use error::ApiError;
pub use service::{
    project_entry, AnalysisView, FileScanOutcome, ProjectScanOutcome, ScanService, Submission,
};
pub use settings::Settings;
