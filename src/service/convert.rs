//! Conversion orchestrator and one-shot retrieval.
//!
//! [`ConversionService::create_pdf`] turns a [`RenderRequest`] into a stored
//! PDF and a download link; [`ConversionService::download_pdf`] hands the
//! bytes back exactly once.
//!
//! # Artifact lifecycle
//!
//! ```text
//! create_pdf ──▶ <uuid>.pdf stored ──▶ download ──▶ deleted
//!                                        │
//!                          second download ──▶ 404 "File not found or expired"
//! ```
//!
//! With [`keep_uploads`](ConversionService::keep_uploads), an uploaded file
//! is stored as `<uuid>.html` next to its PDF once rendering succeeded, and
//! expires together with it.

use std::time::Instant;

use bytes::Bytes;
use cpu_time::ProcessTime;

use super::render::DocumentRenderer;
use super::types::{ConversionOutcome, RenderRequest, ServiceError};
use crate::layout::PageLayout;
use crate::storage::{ArtifactStore, SaveRequest, validate_filename};

/// Path prefix of retrieval handles.
pub const DOWNLOAD_PATH: &str = "/api/v1/pdf/download";

/// Build the retrieval handle for `filename` under `origin`
/// (`scheme://host`).
///
/// ```rust
/// use html2pdf_gateway::service::download_url;
///
/// assert_eq!(
///     download_url("http://localhost:3000/", "a.pdf"),
///     "http://localhost:3000/api/v1/pdf/download/a.pdf"
/// );
/// ```
pub fn download_url(origin: &str, filename: &str) -> String {
    format!("{}{}/{}", origin.trim_end_matches('/'), DOWNLOAD_PATH, filename)
}

/// Metadata key on a PDF naming the upload kept alongside it.
pub const SOURCE_UPLOAD_KEY: &str = "source_upload";

/// Name of the kept upload that belongs to `pdf_filename`.
///
/// ```rust
/// use html2pdf_gateway::service::upload_companion;
///
/// assert_eq!(upload_companion("1234.pdf"), "1234.html");
/// ```
pub fn upload_companion(pdf_filename: &str) -> String {
    let stem = pdf_filename
        .rsplit_once('.')
        .map_or(pdf_filename, |(stem, _)| stem);
    format!("{}.html", stem)
}

/// Drives rendering and storage for each conversion request.
#[derive(Debug, Clone)]
pub struct ConversionService {
    renderer: DocumentRenderer,
    store: ArtifactStore,
    keep_uploads: bool,
}

impl ConversionService {
    pub fn new(renderer: DocumentRenderer, store: ArtifactStore) -> Self {
        Self {
            renderer,
            store,
            keep_uploads: false,
        }
    }

    /// Also persist uploaded HTML inputs (category `upload`) until their PDF
    /// is downloaded.
    pub fn keep_uploads(mut self, keep: bool) -> Self {
        self.keep_uploads = keep;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Render `request`, store the PDF and return its retrieval handle.
    ///
    /// The output name is generated before rendering. Nothing is stored if
    /// rendering fails.
    ///
    /// # Errors
    ///
    /// Any [`ServiceError`]; exactly one error per failed request.
    pub async fn create_pdf(
        &self,
        request: RenderRequest,
        origin: &str,
    ) -> Result<ConversionOutcome, ServiceError> {
        let started = Instant::now();
        let cpu_started = ProcessTime::try_now().ok();
        let kind = request.kind();
        let filename = ArtifactStore::generate_filename(".pdf", None);

        let (pdf, kept_upload) = match request {
            RenderRequest::SourceUrl(url) => {
                let pdf = self
                    .renderer
                    .render_from_url(&url, &PageLayout::fixed_margins())
                    .await?;
                (pdf, None)
            }
            RenderRequest::InlineHtml(markup) => {
                let pdf = self
                    .renderer
                    .render_from_html(&markup, &PageLayout::css_driven())
                    .await?;
                (pdf, None)
            }
            RenderRequest::UploadedHtml {
                markup,
                original_name,
            } => {
                let pdf = self
                    .renderer
                    .render_from_html(&markup, &PageLayout::css_driven())
                    .await?;
                (pdf, self.keep_uploads.then_some((markup, original_name)))
            }
        };

        let mut save = SaveRequest::pdf().with_filename(filename.as_str());
        if kept_upload.is_some() {
            save.metadata
                .insert(SOURCE_UPLOAD_KEY.to_string(), upload_companion(&filename));
        }
        let info = self.store.save_file(Bytes::from(pdf), save).await?;

        if let Some((markup, original_name)) = kept_upload {
            self.keep_upload(markup, &original_name, &info.filename).await;
        }

        let outcome = ConversionOutcome {
            url: download_url(origin, &info.filename),
            filename: info.filename,
            size: info.size,
            elapsed: started.elapsed(),
            cpu_time: cpu_started.and_then(|t| t.try_elapsed().ok()),
        };

        log::info!(
            "PDF request processed: input={} size={} filename={} execution_time_ms={:.2} cpu_time_ms={}",
            kind,
            outcome.size,
            outcome.filename,
            outcome.elapsed.as_secs_f64() * 1000.0,
            outcome
                .cpu_time
                .map_or_else(|| "n/a".to_string(), |d| format!("{:.2}", d.as_secs_f64() * 1000.0))
        );

        Ok(outcome)
    }

    /// Store an upload under its PDF's companion name. The PDF is already
    /// stored, so a failure here is logged and the request still succeeds.
    async fn keep_upload(&self, markup: String, original_name: &str, pdf_filename: &str) {
        let request = SaveRequest::default().with_filename(upload_companion(pdf_filename));
        if let Err(e) = self
            .store
            .save_uploaded_file(Bytes::from(markup), original_name, request)
            .await
        {
            log::error!("❌ Failed to keep upload {} for {}: {}", original_name, pdf_filename, e);
        }
    }

    /// Read a stored PDF without deleting it.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidInput`] ("Invalid filename") for names that
    ///   are empty or contain `..`, `/` or `\`, before storage is touched
    /// - [`ServiceError::NotFound`] ("File not found or expired")
    pub async fn fetch_pdf(&self, filename: &str) -> Result<Bytes, ServiceError> {
        if validate_filename(filename).is_err() {
            log::warn!("⚠️ Rejected download of invalid filename {:?}", filename);
            return Err(ServiceError::InvalidInput("Invalid filename".to_string()));
        }
        Ok(self.store.get_file(filename).await?)
    }

    /// Expire an artifact after it was delivered, together with its kept
    /// upload. Failures are logged, never raised: the client already has
    /// its bytes.
    pub async fn complete_download(&self, filename: &str) -> bool {
        let deleted = match self.store.delete_file(filename).await {
            Ok(deleted) => deleted,
            Err(e) => {
                log::error!("❌ Error deleting temp file {}: {}", filename, e);
                return false;
            }
        };

        if deleted {
            log::info!("Temp file deleted after download: {}", filename);
            if self.keep_uploads {
                self.expire_upload(filename).await;
            }
        }
        deleted
    }

    async fn expire_upload(&self, pdf_filename: &str) {
        let companion = upload_companion(pdf_filename);
        let result = match self.store.file_exists(&companion).await {
            Ok(true) => self.store.delete_file(&companion).await.map(|_| ()),
            Ok(false) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            log::error!("❌ Error deleting kept upload {}: {}", companion, e);
        }
    }

    /// One-shot retrieval: read, then delete.
    pub async fn download_pdf(&self, filename: &str) -> Result<Bytes, ServiceError> {
        let bytes = self.fetch_pdf(filename).await?;
        self.complete_download(filename).await;
        Ok(bytes)
    }
}
