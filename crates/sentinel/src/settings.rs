//! Runtime settings shared by the HTTP server and the CLI.

use oracle::{OracleError, PollConfig, VirusTotalClient, DEFAULT_BASE_URL};
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct Settings {
    pub vt_api_key: Option<SecretString>,
    pub vt_base_url: String,
    pub port: u16,
    /// Holds `ledger.json`, `uploads/` and `quarantine/`.
    pub data_dir: PathBuf,
    pub poll: PollConfig,
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vt_api_key: None,
            vt_base_url: DEFAULT_BASE_URL.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("data"),
            poll: PollConfig::default(),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl Settings {
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger.json")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn quarantine_dir(&self) -> PathBuf {
        self.data_dir.join("quarantine")
    }

    /// Builds the production oracle client.
    ///
    /// # Errors
    /// `OracleError::Unauthorized` when no API key is configured.
    pub fn virustotal(&self) -> Result<VirusTotalClient, OracleError> {
        let key = self.vt_api_key.clone().ok_or(OracleError::Unauthorized)?;
        VirusTotalClient::new(key, self.vt_base_url.clone(), self.http_timeout)
    }
}
