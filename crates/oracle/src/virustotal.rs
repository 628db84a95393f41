//! VirusTotal v3 implementation of [`ReputationOracle`].
//!
//! Endpoints used:
//! - `GET  /files/{sha256}`    fingerprint lookup (404 = never seen)
//! - `POST /files`             multipart upload (`file` part), returns an analysis id
//! - `GET  /files/upload_url`  one-shot upload URL for content above 32 MiB
//! - `GET  /analyses/{id}`     analysis status + stats
//! - `POST /urls`              form-encoded `url`, returns an analysis id

use crate::transport::{AnalysisReport, AnalysisStatus, Lookup, ReputationOracle};
use crate::OracleError;
use async_trait::async_trait;
use bytes::Bytes;
use common::{AnalysisHandle, DetectionStats, EngineResult, Fingerprint, Verdict};
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.virustotal.com/api/v3";

/// Uploads larger than this must go through `/files/upload_url`.
const DIRECT_UPLOAD_LIMIT: usize = 32 * 1024 * 1024;

/// Longest slice of an error body carried into an error message.
const ERROR_BODY_EXCERPT: usize = 200;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FileObject {
    attributes: FileAttributes,
}

#[derive(Debug, Deserialize)]
struct FileAttributes {
    #[serde(default)]
    last_analysis_stats: DetectionStats,
    #[serde(default)]
    last_analysis_results: BTreeMap<String, RawEngine>,
}

#[derive(Debug, Deserialize)]
struct AnalysisObject {
    attributes: AnalysisAttributes,
}

#[derive(Debug, Deserialize)]
struct AnalysisAttributes {
    status: AnalysisStatus,
    #[serde(default)]
    stats: DetectionStats,
    #[serde(default)]
    results: BTreeMap<String, RawEngine>,
}

#[derive(Debug, Deserialize)]
struct RawEngine {
    #[serde(default)]
    engine_name: Option<String>,
    #[serde(default)]
    category: String,
    #[serde(default)]
    result: Option<String>,
}

fn to_verdict(stats: DetectionStats, results: BTreeMap<String, RawEngine>) -> Verdict {
    let engines = results
        .into_iter()
        .map(|(key, raw)| {
            let engine = EngineResult {
                engine_name: raw.engine_name.unwrap_or_else(|| key.clone()),
                category: raw.category,
                result: raw.result,
            };
            (key, engine)
        })
        .collect();
    Verdict { stats, engines }
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, OracleError> {
    serde_json::from_slice(body).map_err(|e| OracleError::Protocol(e.to_string()))
}

/// Parses a `GET /files/{id}` body.
pub(crate) fn parse_file_report(body: &[u8]) -> Result<Verdict, OracleError> {
    let env: Envelope<FileObject> = parse(body)?;
    let attrs = env.data.attributes;
    Ok(to_verdict(attrs.last_analysis_stats, attrs.last_analysis_results))
}

/// Parses a `GET /analyses/{id}` body.
pub(crate) fn parse_analysis(body: &[u8]) -> Result<AnalysisReport, OracleError> {
    let env: Envelope<AnalysisObject> = parse(body)?;
    let attrs = env.data.attributes;
    Ok(AnalysisReport {
        status: attrs.status,
        verdict: to_verdict(attrs.stats, attrs.results),
    })
}

/// Parses any `{"data": {"id": ...}}` body (file and URL submissions).
pub(crate) fn parse_submission(body: &[u8]) -> Result<AnalysisHandle, OracleError> {
    let env: Envelope<IdOnly> = parse(body)?;
    Ok(AnalysisHandle::new(env.data.id))
}

/// Maps a non-success status to the error taxonomy.
pub(crate) fn status_error(status: StatusCode, body: &str) -> OracleError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OracleError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => OracleError::RateLimited,
        _ => {
            let excerpt: String = body.chars().take(ERROR_BODY_EXCERPT).collect();
            OracleError::Transport(format!("HTTP {status}: {excerpt}"))
        }
    }
}

/// HTTP client for the VirusTotal v3 API.
pub struct VirusTotalClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
}

impl VirusTotalClient {
    /// # Errors
    /// `OracleError::Transport` when the HTTP client cannot be initialized.
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Transport(format!("HTTP client init: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("x-apikey", self.api_key.expose_secret())
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, OracleError> {
        self.authed(builder)
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))
    }

    /// Reads the body of a response, mapping non-2xx statuses to errors.
    async fn success_body(response: Response) -> Result<Bytes, OracleError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(status_error(status, &String::from_utf8_lossy(&body)))
        }
    }

    async fn upload_target(&self, size: usize) -> Result<String, OracleError> {
        if size <= DIRECT_UPLOAD_LIMIT {
            return Ok(self.url("files"));
        }
        let response = self.send(self.http.get(self.url("files/upload_url"))).await?;
        let body = Self::success_body(response).await?;
        let env: Envelope<String> = parse(&body)?;
        Ok(env.data)
    }
}

#[async_trait]
impl ReputationOracle for VirusTotalClient {
    async fn lookup(&self, fingerprint: &Fingerprint) -> Lookup {
        let response = match self
            .send(self.http.get(self.url(&format!("files/{fingerprint}"))))
            .await
        {
            Ok(r) => r,
            Err(e) => return Lookup::TransportError(e),
        };

        if response.status() == StatusCode::NOT_FOUND {
            return Lookup::NotFound;
        }
        match Self::success_body(response).await.and_then(|b| parse_file_report(&b)) {
            Ok(verdict) => Lookup::Found(verdict),
            Err(e) => Lookup::TransportError(e),
        }
    }

    async fn submit(&self, file_name: &str, content: Bytes) -> Result<AnalysisHandle, OracleError> {
        let target = self.upload_target(content.len()).await?;
        let len = content.len() as u64;
        let part =
            multipart::Part::stream_with_length(content, len).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        let response = self.send(self.http.post(target).multipart(form)).await?;
        let body = Self::success_body(response).await?;
        parse_submission(&body)
    }

    async fn analysis(&self, handle: &AnalysisHandle) -> Result<AnalysisReport, OracleError> {
        let response = self
            .send(self.http.get(self.url(&format!("analyses/{handle}"))))
            .await?;
        let body = Self::success_body(response).await?;
        parse_analysis(&body)
    }

    async fn submit_url(&self, url: &str) -> Result<AnalysisHandle, OracleError> {
        let response = self
            .send(self.http.post(self.url("urls")).form(&[("url", url)]))
            .await?;
        let body = Self::success_body(response).await?;
        parse_submission(&body)
    }
}
