//! HTTP server.
//!
//! Exposes the [`Pipeline`] operations as a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Banner message |
//! | `GET`  | `/status` | Status and version |
//! | `POST` | `/upload` | Multipart upload, field `file` |
//! | `POST` | `/clean/{filename}` | Clean a raw file, returns a 10-row preview |
//! | `GET`  | `/view/{filename}` | 20-row preview of a cleaned file |
//! | `GET`  | `/download/{filename}` | Cleaned file as `text/csv` |
//! | `GET`  | `/files` | Raw and cleaned file names |
//! | `GET`  | `/logs` | Recent activity lines (`?lines=N`) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "cleaned file not found: a.csv" } }
//! ```
//!
//! Error codes: `unsupported_format` (400), `invalid_filename` (400),
//! `bad_request` (400), `not_found` (404), `decode_error` (422),
//! `internal` (500).
//!
//! Pipeline calls do blocking file I/O and run on tokio's blocking pool.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::error::PipelineError;
use crate::models::{CleanReport, Listing, Preview, UploadReceipt};
use crate::pipeline::Pipeline;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(Pipeline::from_config(config)));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(
        "listening on http://{} (raw: {}, cleaned: {})",
        bind_addr,
        config.storage.raw_dir().display(),
        config.storage.cleaned_dir().display()
    );
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router around an existing pipeline.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_home))
        .route("/status", get(handle_status))
        .route("/upload", post(handle_upload))
        .route("/clean/{filename}", post(handle_clean))
        .route("/view/{filename}", get(handle_view))
        .route("/download/{filename}", get(handle_download))
        .route("/files", get(handle_list))
        .route("/logs", get(handle_logs))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .with_state(AppState { pipeline })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::UnsupportedFormat { .. } | PipelineError::InvalidFilename(_) => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::NotFound { .. } => StatusCode::NOT_FOUND,
            PipelineError::Decode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Encode(_) | PipelineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Runs a pipeline operation on the blocking pool.
async fn blocking<T, F>(state: &AppState, op: F) -> Result<T, AppError>
where
    F: FnOnce(&Pipeline) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pipeline = state.pipeline.clone();
    tokio::task::spawn_blocking(move || op(&pipeline))
        .await
        .map_err(|e| internal(format!("worker failed: {}", e)))?
        .map_err(AppError::from)
}

// ============ GET / and /status ============

#[derive(Serialize)]
struct HomeResponse {
    message: String,
}

async fn handle_home() -> Json<HomeResponse> {
    Json(HomeResponse {
        message: "tabwash backend running".to_string(),
    })
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    version: String,
}

async fn handle_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OK".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /upload ============

/// Stores the multipart field named `file` under its declared filename.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadReceipt>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| bad_request("`file` field has no filename"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(e.to_string()))?;

        let receipt = blocking(&state, move |p| p.upload(&filename, &bytes)).await?;
        return Ok(Json(receipt));
    }

    Err(bad_request("multipart body has no `file` field"))
}

// ============ POST /clean/{filename} ============

#[derive(Serialize)]
struct CleanResponse {
    message: String,
    #[serde(flatten)]
    report: CleanReport,
}

async fn handle_clean(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<CleanResponse>, AppError> {
    let report = blocking(&state, move |p| p.clean(&filename)).await?;
    Ok(Json(CleanResponse {
        message: "File cleaned successfully".to_string(),
        report,
    }))
}

// ============ GET /view/{filename} ============

async fn handle_view(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<Preview>, AppError> {
    let preview = blocking(&state, move |p| p.view(&filename)).await?;
    Ok(Json(preview))
}

// ============ GET /download/{filename} ============

async fn handle_download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let name = filename.clone();
    let bytes = blocking(&state, move |p| p.download(&name)).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        filename.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

// ============ GET /files ============

async fn handle_list(State(state): State<AppState>) -> Result<Json<Listing>, AppError> {
    let listing = blocking(&state, |p| p.list()).await?;
    Ok(Json(listing))
}

// ============ GET /logs ============

#[derive(Deserialize)]
struct LogsQuery {
    lines: Option<usize>,
}

#[derive(Serialize)]
struct LogsResponse {
    logs: Vec<String>,
}

async fn handle_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, AppError> {
    let logs = blocking(&state, move |p| p.logs(query.lines)).await?;
    Ok(Json(LogsResponse { logs }))
}
