//! HTTP surface.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | GET | `/health` | |
//! | POST | `/api/scan` | multipart `file` |
//! | GET | `/api/analysis/:id` | |
//! | POST | `/api/scan/project-batch` | multipart `files`, `paths`, `projectName`, `include` |
//! | POST | `/api/monitor/url` | `{url}` |
//! | GET | `/api/history` | |
//! | GET | `/api/quarantine` | |
//! | POST | `/api/quarantine/move` | `{filePath, reason}` |
//! | POST | `/api/quarantine/:id/restore` | |
//! | DELETE | `/api/file` | `{id, type: quarantine\|history_log}` |

use crate::error::ApiError;
use crate::service::{AnalysisView, ProjectScanOutcome, ScanService, Submission};
use anatomist::{default_exclusions, set_label_enabled, BatchFile, ExclusionSet};
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use common::{LedgerEntry, QuarantineEntry, RecordKind};
use reaper::StagedFile;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

type AppState = Arc<ScanService>;

pub fn router(service: Arc<ScanService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/scan", post(scan_upload))
        .route("/api/analysis/:id", get(analysis))
        .route("/api/scan/project-batch", post(project_batch))
        .route("/api/monitor/url", post(monitor_url))
        .route("/api/history", get(history))
        .route("/api/quarantine", get(quarantine_list))
        .route("/api/quarantine/move", post(quarantine_move))
        .route("/api/quarantine/:id/restore", post(quarantine_restore))
        .route("/api/file", delete(delete_record))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(service)
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(service: Arc<ScanService>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "vigil API listening");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

fn bad_multipart(e: MultipartError) -> ApiError {
    ApiError::InputError(format!("malformed upload: {e}"))
}

fn staging_failed(e: std::io::Error) -> ApiError {
    ApiError::StorageError(format!("cannot stage upload: {e}"))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::InputError(e.body_text()))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InputError(format!("invalid id `{raw}`")))
}

async fn scan_upload(
    State(service): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Submission>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(bad_multipart)?;
        let staged = StagedFile::write(service.uploads_dir(), &name, &bytes)
            .await
            .map_err(staging_failed)?;
        return Ok(Json(service.submit_file(staged).await?));
    }
    Err(ApiError::InputError("No file uploaded".into()))
}

async fn analysis(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisView>, ApiError> {
    Ok(Json(service.check_analysis(&id).await?))
}

async fn project_batch(
    State(service): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProjectScanOutcome>, ApiError> {
    let mut staged: Vec<StagedFile> = Vec::new();
    let mut paths: Vec<String> = Vec::new();
    let mut include: Vec<String> = Vec::new();
    let mut project = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("files") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                let file = StagedFile::write(service.uploads_dir(), &name, &bytes)
                    .await
                    .map_err(staging_failed)?;
                staged.push(file);
            }
            Some("paths") => paths.push(field.text().await.map_err(bad_multipart)?),
            Some("include") => include.push(field.text().await.map_err(bad_multipart)?),
            Some("projectName") => project = Some(field.text().await.map_err(bad_multipart)?),
            _ => {}
        }
    }

    let mut rules = default_exclusions();
    for label in &include {
        set_label_enabled(&mut rules, label.trim(), false);
    }
    let exclusions =
        ExclusionSet::new(&rules).map_err(|e| ApiError::InputError(e.to_string()))?;

    // paths[i] names files[i]; fall back to the upload's own name.
    let files: Vec<BatchFile> = staged
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let path = paths
                .get(i)
                .filter(|p| !p.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| s.name().to_string());
            BatchFile::staged(path, s.path())
        })
        .collect();

    let project = project
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| "project".to_string());
    let outcome = service.scan_project(&project, files, exclusions).await?;
    // staged uploads are removed here, after the batch has read them
    drop(staged);
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
struct MonitorRequest {
    #[serde(default)]
    url: String,
}

async fn monitor_url(
    State(service): State<AppState>,
    payload: Result<Json<MonitorRequest>, JsonRejection>,
) -> Result<Json<watchtower::MonitorReport>, ApiError> {
    let req = body(payload)?;
    Ok(Json(service.monitor_url(&req.url).await?))
}

async fn history(State(service): State<AppState>) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    Ok(Json(service.history().await?))
}

async fn quarantine_list(
    State(service): State<AppState>,
) -> Result<Json<Vec<QuarantineEntry>>, ApiError> {
    Ok(Json(service.quarantine_list().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest {
    file_path: String,
    #[serde(default)]
    reason: String,
}

async fn quarantine_move(
    State(service): State<AppState>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<QuarantineEntry>, ApiError> {
    let req = body(payload)?;
    if req.file_path.trim().is_empty() {
        return Err(ApiError::InputError("filePath is required".into()));
    }
    let reason = if req.reason.trim().is_empty() {
        "Manual quarantine"
    } else {
        req.reason.as_str()
    };
    Ok(Json(
        service
            .quarantine_move(std::path::Path::new(&req.file_path), reason)
            .await?,
    ))
}

async fn quarantine_restore(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuarantineEntry>, ApiError> {
    Ok(Json(service.quarantine_restore(parse_id(&id)?).await?))
}

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    id: String,
    #[serde(rename = "type")]
    kind: RecordKind,
}

async fn delete_record(
    State(service): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let req = body(payload)?;
    service.delete_record(parse_id(&req.id)?, req.kind).await?;
    Ok(Json(json!({ "success": true })))
}
