//! Axum HTTP surface.
//!
//! # Routes
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `POST` | `/api/v1/pdf` | render and store, `201 {status, data: {url}}` |
//! | `GET` | `/api/v1/pdf/download/{filename}` | one-shot PDF download |
//! | `GET` | `/health` | `{status: "ok", timestamp, session}` |
//! | any | anything else | `404 {status: "fail", message}` |
//!
//! # Request Bodies
//!
//! `POST /api/v1/pdf` accepts, by `Content-Type`:
//!
//! | Content-Type | Fields |
//! |--------------|--------|
//! | `application/json` | `{"url": ...}` or `{"html": ...}` |
//! | `application/x-www-form-urlencoded` | `url=...` or `html=...` |
//! | `multipart/form-data` | file part `htmlFile`, optional `url` / `html` text parts |
//!
//! # Setup
//!
//! ```rust,ignore
//! use html2pdf_gateway::integrations::axum::{AppState, router, shutdown_signal};
//!
//! let app = router(AppState::new(service, sessions.clone()), config.body_limit);
//! let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
//!
//! axum::serve(listener, app)
//!     .with_graceful_shutdown(shutdown_signal())
//!     .await?;
//!
//! sessions.shutdown().await;
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;

use crate::manager::SessionManager;
use crate::service::{
    ConversionService, CreatePdfResponse, ErrorResponse, HealthResponse, RenderRequest,
    ServiceError, UploadedFile,
};

/// Multipart part carrying the uploaded HTML file.
pub const UPLOAD_FIELD: &str = "htmlFile";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConversionService>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(service: ConversionService, sessions: Arc<SessionManager>) -> Self {
        Self {
            service: Arc::new(service),
            sessions,
        }
    }
}

/// Build the application router.
///
/// `body_limit` bounds every request body, uploads included.
pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/api/v1/pdf", post(create_pdf))
        .route("/api/v1/pdf/download/{filename}", get(download_pdf))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// JSON and form body of `POST /api/v1/pdf`.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePdfBody {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

async fn create_pdf(
    State(state): State<AppState>,
    request: Request,
) -> Result<(StatusCode, Json<CreatePdfResponse>), ServiceError> {
    let origin = request_origin(request.headers());
    let (url, html, upload) = read_inputs(request, &state).await?;

    let render = RenderRequest::from_inputs(url, html, upload)?;
    let outcome = state.service.create_pdf(render, &origin).await?;

    Ok((StatusCode::CREATED, Json(CreatePdfResponse::from(&outcome))))
}

/// Stream the PDF, then delete it once the body has been fully produced.
///
/// A client that disconnects early drops the stream before the delete runs,
/// leaving the artifact for a retry.
async fn download_pdf(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ServiceError> {
    let bytes = state.service.fetch_pdf(&filename).await?;

    let service = Arc::clone(&state.service);
    let name = filename.clone();
    let stream = async_stream::stream! {
        yield Ok::<Bytes, Infallible>(bytes);
        service.complete_download(&name).await;
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/pdf")
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| ServiceError::Internal(format!("building download response: {}", e)))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(
        state.sessions.engine_name(),
        state.sessions.stats().await,
    ))
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ErrorResponse>) {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::fail(format!(
            "Can't find {} on this server!",
            target
        ))),
    )
}

// ============================================================================
// Request helpers
// ============================================================================

type Inputs = (Option<String>, Option<String>, Option<UploadedFile>);

/// `scheme://host` of the incoming request.
///
/// The scheme comes from `X-Forwarded-Proto` (first value) and defaults to
/// `http`; the host comes from the `Host` header.
pub fn request_origin(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    format!("{}://{}", scheme, host)
}

async fn read_inputs(request: Request, state: &AppState) -> Result<Inputs, ServiceError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ServiceError::InvalidInput(e.body_text()))?;
        return read_multipart(multipart).await;
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(body) = Form::<CreatePdfBody>::from_request(request, state)
            .await
            .map_err(|e| ServiceError::InvalidInput(e.body_text()))?;
        return Ok((body.url, body.html, None));
    }

    let Json(body) = Json::<CreatePdfBody>::from_request(request, state)
        .await
        .map_err(|e| ServiceError::InvalidInput(e.body_text()))?;
    Ok((body.url, body.html, None))
}

async fn read_multipart(mut multipart: Multipart) -> Result<Inputs, ServiceError> {
    let mut url = None;
    let mut html = None;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidInput(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        let original_name = field.file_name().unwrap_or_default().to_owned();

        match name.as_deref() {
            Some(UPLOAD_FIELD) => {
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| ServiceError::InvalidInput(e.body_text()))?;
                // Browsers send an empty part when no file was chosen.
                if !(content.is_empty() && original_name.is_empty()) {
                    upload = Some(UploadedFile {
                        content,
                        original_name,
                    });
                }
            }
            Some("url") => {
                url = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ServiceError::InvalidInput(e.body_text()))?,
                );
            }
            Some("html") => {
                html = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ServiceError::InvalidInput(e.body_text()))?,
                );
            }
            other => log::debug!("Ignoring unexpected multipart field {:?}", other),
        }
    }

    Ok((url, html, upload))
}

// ============================================================================
// Errors and shutdown
// ============================================================================

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            log::error!("❌ [{}] {}", self.error_code(), self);
        } else {
            log::warn!("⚠️ [{}] {}", self.error_code(), self);
        }

        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("❌ Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("❌ Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("SIGINT received, shutting down gracefully"),
        _ = terminate => log::info!("SIGTERM received, shutting down gracefully"),
    }
}
