//! Request, response and error types of the conversion service.
//!
//! Everything here is framework-agnostic; the axum integration only maps
//! these types onto HTTP.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::stats::SessionStats;
use crate::storage::StorageError;

/// Message returned to callers for non-operational failures.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went very wrong!";

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by the conversion service.
///
/// | Variant | Status | Code | Message exposed |
/// |---------|--------|------|-----------------|
/// | `InvalidInput` | 400 | `INVALID_INPUT` | yes |
/// | `SessionUnavailable` | 500 | `SESSION_UNAVAILABLE` | yes |
/// | `RenderFailed` | 500 | `RENDER_FAILED` | yes |
/// | `NotFound` | 404 | `NOT_FOUND` | yes |
/// | `StorageFailure` | 500 | `STORAGE_FAILURE` | no |
/// | `Internal` | 500 | `INTERNAL_ERROR` | no |
///
/// "Exposed" errors are operational: their message is safe to show. The
/// others answer with [`GENERIC_ERROR_MESSAGE`] and are only logged in full.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request is malformed: no input, bad URL, bad upload, bad filename.
    #[error("{0}")]
    InvalidInput(String),

    /// No render session could be obtained.
    #[error("Render engine unavailable: {0}")]
    SessionUnavailable(#[source] EngineError),

    /// The engine failed while loading or exporting the document.
    #[error("PDF rendering failed: {0}")]
    RenderFailed(#[source] EngineError),

    /// The artifact does not exist (never created, expired, or already
    /// downloaded).
    #[error("{0}")]
    NotFound(String),

    /// The artifact store failed.
    #[error("Storage failure: {0}")]
    StorageFailure(#[source] StorageError),

    /// A bug or a panicked task.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status code for this error.
    ///
    /// ```rust
    /// use html2pdf_gateway::service::ServiceError;
    ///
    /// assert_eq!(ServiceError::InvalidInput("x".into()).status_code(), 400);
    /// assert_eq!(ServiceError::NotFound("x".into()).status_code(), 404);
    /// ```
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::SessionUnavailable(_)
            | Self::RenderFailed(_)
            | Self::StorageFailure(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code, used in logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::SessionUnavailable(_) => "SESSION_UNAVAILABLE",
            Self::RenderFailed(_) => "RENDER_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::StorageFailure(_) => "STORAGE_FAILURE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the message may be shown to the caller as-is.
    pub fn is_operational(&self) -> bool {
        !matches!(self, Self::StorageFailure(_) | Self::Internal(_))
    }

    /// Shorthand for the download route's missing-artifact error.
    pub fn artifact_missing() -> Self {
        Self::NotFound("File not found or expired".to_string())
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => Self::artifact_missing(),
            StorageError::InvalidFilename(_) => Self::InvalidInput("Invalid filename".to_string()),
            other => Self::StorageFailure(other),
        }
    }
}

/// JSON error body: `{"status": "fail" | "error", "message": ...}`.
///
/// `status` is `fail` for 4xx and `error` for 5xx.
///
/// ```rust
/// use html2pdf_gateway::service::{ErrorResponse, ServiceError};
///
/// let body = ErrorResponse::from(&ServiceError::InvalidInput("Invalid filename".into()));
/// assert_eq!(body.status, "fail");
/// assert_eq!(body.message, "Invalid filename");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    /// Body for a 4xx answer.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail".to_string(),
            message: message.into(),
        }
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        let status = if err.status_code() < 500 { "fail" } else { "error" };
        let message = if err.is_operational() {
            err.to_string()
        } else {
            GENERIC_ERROR_MESSAGE.to_string()
        };
        Self {
            status: status.to_string(),
            message,
        }
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// An uploaded HTML file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub content: Bytes,
    pub original_name: String,
}

/// One conversion request, after input precedence has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderRequest {
    SourceUrl(String),
    InlineHtml(String),
    /// An upload whose content was already decoded as UTF-8.
    UploadedHtml {
        markup: String,
        original_name: String,
    },
}

impl RenderRequest {
    /// Select the input path from the raw request fields.
    ///
    /// Precedence is URL, then uploaded file, then inline HTML. Empty and
    /// whitespace-only strings count as absent.
    ///
    /// ```rust
    /// use html2pdf_gateway::service::RenderRequest;
    ///
    /// let request = RenderRequest::from_inputs(
    ///     Some("https://example.com".into()),
    ///     Some("<h1>ignored</h1>".into()),
    ///     None,
    /// )
    /// .unwrap();
    /// assert_eq!(request.kind(), "url");
    /// ```
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidInput`] when nothing usable is present, the
    /// URL is not absolute http(s), or the upload is not a non-empty UTF-8
    /// `.html`/`.htm` file.
    pub fn from_inputs(
        url: Option<String>,
        html: Option<String>,
        upload: Option<UploadedFile>,
    ) -> Result<Self, ServiceError> {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            return Ok(Self::SourceUrl(validate_url(&url)?));
        }

        if let Some(upload) = upload {
            validate_upload(&upload)?;
            let markup = String::from_utf8(Vec::from(upload.content)).map_err(|_| {
                ServiceError::InvalidInput("Uploaded file is not valid UTF-8".to_string())
            })?;
            return Ok(Self::UploadedHtml {
                markup,
                original_name: upload.original_name,
            });
        }

        if let Some(html) = html.filter(|h| !h.trim().is_empty()) {
            return Ok(Self::InlineHtml(html));
        }

        Err(ServiceError::InvalidInput(
            "A url, an htmlFile upload or html content is required".to_string(),
        ))
    }

    /// Input kind for logs: `url`, `upload` or `html`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUrl(_) => "url",
            Self::UploadedHtml { .. } => "upload",
            Self::InlineHtml(_) => "html",
        }
    }
}

/// Parse and normalize an absolute `http`/`https` URL.
pub fn validate_url(url: &str) -> Result<String, ServiceError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput("URL is required".to_string()));
    }

    match url::Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(parsed.to_string()),
        Ok(parsed) => {
            log::debug!("URL validation failed for '{}': scheme {}", trimmed, parsed.scheme());
            Err(ServiceError::InvalidInput(format!(
                "Invalid URL: unsupported scheme '{}'",
                parsed.scheme()
            )))
        }
        Err(e) => {
            log::debug!("URL validation failed for '{}': {}", trimmed, e);
            Err(ServiceError::InvalidInput(format!("Invalid URL: {}", e)))
        }
    }
}

fn validate_upload(upload: &UploadedFile) -> Result<(), ServiceError> {
    let extension = std::path::Path::new(&upload.original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    if !matches!(extension.as_deref(), Some("html") | Some("htm")) {
        return Err(ServiceError::InvalidInput(
            "Only .html and .htm files are allowed".to_string(),
        ));
    }
    if upload.content.is_empty() {
        return Err(ServiceError::InvalidInput("Uploaded file is empty".to_string()));
    }
    Ok(())
}

// ============================================================================
// Response Types
// ============================================================================

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub filename: String,
    /// One-shot retrieval handle.
    pub url: String,
    pub size: u64,
    pub elapsed: std::time::Duration,
    /// Process CPU time spent while serving the request, where the platform
    /// reports it.
    pub cpu_time: Option<std::time::Duration>,
}

/// `{"url": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfLink {
    pub url: String,
}

/// `201` body: `{"status": "success", "data": {"url": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePdfResponse {
    pub status: String,
    pub data: PdfLink,
}

impl From<&ConversionOutcome> for CreatePdfResponse {
    fn from(outcome: &ConversionOutcome) -> Self {
        Self {
            status: "success".to_string(),
            data: PdfLink {
                url: outcome.url.clone(),
            },
        }
    }
}

/// `/health` body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `ok` when the endpoint answers.
    pub status: String,
    /// RFC 3339.
    pub timestamp: String,
    /// Render engine name, e.g. `chrome`.
    pub engine: &'static str,
    pub session: SessionStats,
}

impl HealthResponse {
    pub fn new(engine: &'static str, session: SessionStats) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            engine,
            session,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content: &'static [u8]) -> UploadedFile {
        UploadedFile {
            content: Bytes::from_static(content),
            original_name: name.to_string(),
        }
    }

    #[test]
    fn test_url_beats_everything() {
        let request = RenderRequest::from_inputs(
            Some("https://example.com/a".into()),
            Some("<p>html</p>".into()),
            Some(upload("a.html", b"<p>upload</p>")),
        )
        .unwrap();
        assert_eq!(request, RenderRequest::SourceUrl("https://example.com/a".into()));
    }

    #[test]
    fn test_upload_beats_inline_html() {
        let request = RenderRequest::from_inputs(
            None,
            Some("<p>html</p>".into()),
            Some(upload("page.HTM", b"<p>upload</p>")),
        )
        .unwrap();
        assert_eq!(request.kind(), "upload");
        assert_eq!(
            request,
            RenderRequest::UploadedHtml {
                markup: "<p>upload</p>".into(),
                original_name: "page.HTM".into(),
            }
        );
    }

    #[test]
    fn test_whitespace_counts_as_absent() {
        let request =
            RenderRequest::from_inputs(Some("   ".into()), Some("<b>x</b>".into()), None).unwrap();
        assert_eq!(request, RenderRequest::InlineHtml("<b>x</b>".into()));

        let result = RenderRequest::from_inputs(Some("".into()), Some(" \n ".into()), None);
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }

    #[test]
    fn test_nothing_present_is_invalid() {
        let result = RenderRequest::from_inputs(None, None, None);
        match result {
            Err(e) => {
                assert_eq!(e.status_code(), 400);
                assert!(e.to_string().contains("required"));
            }
            Ok(_) => panic!("Expected InvalidInput"),
        }
    }

    #[test]
    fn test_validate_url() {
        assert_eq!(
            validate_url("https://example.com").unwrap(),
            "https://example.com/"
        );
        assert!(validate_url("http://localhost:8080/x").is_ok());
        assert!(validate_url("example.com").is_err());
        assert!(validate_url("/relative/path").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("").is_err());
    }

    #[test]
    fn test_upload_validation() {
        let bad_ext = RenderRequest::from_inputs(None, None, Some(upload("a.txt", b"x")));
        assert!(matches!(bad_ext, Err(ServiceError::InvalidInput(_))));

        let empty = RenderRequest::from_inputs(None, None, Some(upload("a.html", b"")));
        assert!(matches!(empty, Err(ServiceError::InvalidInput(_))));

        let binary = RenderRequest::from_inputs(None, None, Some(upload("a.html", &[0xff, 0xfe])));
        assert!(matches!(binary, Err(ServiceError::InvalidInput(_))));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::InvalidInput(String::new()).status_code(), 400);
        assert_eq!(ServiceError::artifact_missing().status_code(), 404);
        assert_eq!(
            ServiceError::SessionUnavailable(EngineError::ShuttingDown).status_code(),
            500
        );
        assert_eq!(
            ServiceError::RenderFailed(EngineError::ExportFailed(String::new())).status_code(),
            500
        );
        assert_eq!(ServiceError::Internal(String::new()).status_code(), 500);
    }

    #[test]
    fn test_storage_error_mapping() {
        let err: ServiceError = StorageError::NotFound("a.pdf".into()).into();
        assert_eq!(err.to_string(), "File not found or expired");

        let err: ServiceError = StorageError::InvalidFilename("../a".into()).into();
        assert_eq!(err.to_string(), "Invalid filename");

        let io = std::io::Error::other("disk full");
        let err: ServiceError = StorageError::Io(io).into();
        assert!(!err.is_operational());
    }

    #[test]
    fn test_error_response_hides_internal_detail() {
        let body = ErrorResponse::from(&ServiceError::Internal("stack trace".into()));
        assert_eq!(body.status, "error");
        assert_eq!(body.message, GENERIC_ERROR_MESSAGE);

        let body = ErrorResponse::from(&ServiceError::RenderFailed(
            EngineError::NavigationTimeout("30s".into()),
        ));
        assert_eq!(body.status, "error");
        assert!(body.message.contains("Navigation timeout"));
    }

    #[test]
    fn test_error_response_hides_storage_detail() {
        let err = ServiceError::from(StorageError::Io(std::io::Error::other(
            "/var/lib/pdf/temp: permission denied",
        )));
        assert_eq!(err.status_code(), 500);

        let body = ErrorResponse::from(&err);
        assert_eq!(body.status, "error");
        assert_eq!(body.message, GENERIC_ERROR_MESSAGE);
        assert!(!body.message.contains("/var/lib"));
    }

    #[test]
    fn test_create_response_shape() {
        let outcome = ConversionOutcome {
            filename: "a.pdf".into(),
            url: "http://h/api/v1/pdf/download/a.pdf".into(),
            size: 10,
            elapsed: std::time::Duration::from_millis(5),
            cpu_time: None,
        };
        let json = serde_json::to_value(CreatePdfResponse::from(&outcome)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["url"], "http://h/api/v1/pdf/download/a.pdf");
    }
}
