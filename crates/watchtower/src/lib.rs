//! # The Watchtower: Web Exposure Monitor
//!
//! Fetches a URL, audits the response headers for missing protections and
//! server fingerprint leaks, and queues the URL with the reputation oracle.
//!
//! Any HTTP status is accepted; a 404 page still has headers worth auditing.
//! Only a failure to get a response at all is an error. Oracle submission is
//! best-effort: a failure is logged and the report carries no reputation.

use oracle::ReputationOracle;
use reqwest::header::HeaderMap;
use reqwest::{Client, Url};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
}

/// Oracle acknowledgement of a URL submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlReputation {
    pub analysis_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorReport {
    pub url: String,
    /// HTTP status code of the final response.
    pub status: u16,
    pub security_issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation: Option<UrlReputation>,
}

pub struct UrlMonitor {
    http: Client,
    oracle: Option<Arc<dyn ReputationOracle>>,
}

impl UrlMonitor {
    pub fn new(timeout: Duration) -> Result<Self, MonitorError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MonitorError::Fetch {
                url: String::new(),
                reason: format!("HTTP client init: {e}"),
            })?;
        Ok(Self { http, oracle: None })
    }

    /// Also submit every monitored URL to `oracle`.
    pub fn with_oracle(mut self, oracle: Arc<dyn ReputationOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub async fn check(&self, url: &str) -> Result<MonitorReport, MonitorError> {
        let parsed = parse_target(url)?;

        let response = self
            .http
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| MonitorError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let status = response.status().as_u16();
        let security_issues = audit_headers(&parsed, response.headers());
        tracing::info!(%url, status, issues = security_issues.len(), "url audited");

        let reputation = match &self.oracle {
            None => None,
            Some(oracle) => match oracle.submit_url(url).await {
                Ok(handle) => Some(UrlReputation {
                    analysis_id: handle.as_str().to_string(),
                }),
                Err(e) => {
                    tracing::warn!(%url, error = %e, "oracle URL submission failed");
                    None
                }
            },
        };

        Ok(MonitorReport {
            url: url.to_string(),
            status,
            security_issues,
            reputation,
        })
    }
}

fn parse_target(url: &str) -> Result<Url, MonitorError> {
    let invalid = |reason: String| MonitorError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(invalid(format!("unsupported scheme `{other}`"))),
    }
}

/// Security findings for one response's headers, in a fixed order.
pub fn audit_headers(url: &Url, headers: &HeaderMap) -> Vec<String> {
    let mut issues = Vec::new();
    let value = |name: &str| {
        headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    };

    if !headers.contains_key("content-security-policy") {
        issues.push("Missing Content-Security-Policy".to_string());
    }
    if !headers.contains_key("x-frame-options") {
        issues.push("Missing X-Frame-Options".to_string());
    }
    if url.scheme() == "https" && !headers.contains_key("strict-transport-security") {
        issues.push("Missing HSTS".to_string());
    }
    if let Some(powered_by) = value("x-powered-by") {
        issues.push(format!("Leaking Server Info: {powered_by}"));
    }
    // Server is only a leak when it carries a version number.
    if let Some(server) = value("server").filter(|s| s.chars().any(|c| c.is_ascii_digit())) {
        issues.push(format!("Leaking Server Version: {server}"));
    }
    if let Some(aspnet) = value("x-aspnet-version") {
        issues.push(format!("Leaking Framework Version: {aspnet}"));
    }
    issues
}
