//! Conversion service.
//!
//! The framework-agnostic core between the HTTP layer and the render
//! engine. The axum integration is a thin mapping onto these types.
//!
//! # Module Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ service                                                      │
//! │                                                              │
//! │  convert.rs                 render.rs             types.rs   │
//! │  ┌──────────────────────┐   ┌─────────────────┐   ┌────────┐ │
//! │  │ ConversionService    │──▶│ DocumentRenderer│   │Service │ │
//! │  │  create_pdf()        │   │  render_from_*  │   │ Error  │ │
//! │  │  download_pdf()      │   └────────┬────────┘   │Render  │ │
//! │  └──────────┬───────────┘            │            │Request │ │
//! │             │                        ▼            └────────┘ │
//! │             ▼                  SessionManager                │
//! │        ArtifactStore                                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Layer | Responsibility | Here? |
//! |-------|----------------|-------|
//! | **Service** | input precedence, rendering, storage, one-shot retrieval | ✅ |
//! | **Handler** | body parsing, origin detection, streaming | ❌ (integrations) |
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_gateway::service::{ConversionService, DocumentRenderer, RenderRequest};
//!
//! let service = ConversionService::new(
//!     DocumentRenderer::new(sessions.clone(), WaitPolicy::default()),
//!     store,
//! );
//!
//! let request = RenderRequest::from_inputs(None, Some("<h1>Hi</h1>".into()), None)?;
//! let outcome = service.create_pdf(request, "http://localhost:3000").await?;
//! println!("Download once at {}", outcome.url);
//! ```

mod convert;
mod render;
mod types;

pub use convert::{
    ConversionService, DOWNLOAD_PATH, SOURCE_UPLOAD_KEY, download_url, upload_companion,
};
pub use render::DocumentRenderer;
pub use types::{
    ConversionOutcome, CreatePdfResponse, ErrorResponse, GENERIC_ERROR_MESSAGE, HealthResponse,
    PdfLink, RenderRequest, ServiceError, UploadedFile, validate_url,
};
