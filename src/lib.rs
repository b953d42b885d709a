//! # html2pdf-gateway
//!
//! HTTP service that renders a URL, inline HTML, or an uploaded HTML file to
//! PDF on one shared headless Chrome session, stores the result, and hands
//! back a download link that works exactly once.
//!
//! ## Features
//!
//! - **Shared Session**: One lazily launched browser, relaunched when it dies
//! - **Isolated Contexts**: Every render gets its own tab, closed on every path
//! - **Pluggable Storage**: Local directory or S3-compatible object store
//! - **One-shot Downloads**: Artifacts are deleted once delivered
//! - **Graceful Shutdown**: Stops accepting work, then closes the browser
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │      integrations::axum (HTTP surface)      │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │        service::ConversionService           │
//! │   input precedence · naming · one-shot      │
//! └───────┬─────────────────────────┬───────────┘
//!         │                         │
//!         ▼                         ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ DocumentRenderer │     │  ArtifactStore   │
//! │  ContextHandle   │     │  local │ s3      │
//! └───────┬──────────┘     └──────────────────┘
//!         ▼
//! ┌──────────────────┐
//! │  SessionManager  │
//! │  RenderSession   │──▶ headless Chrome
//! └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use html2pdf_gateway::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let sessions = Arc::new(
//!         SessionManager::builder()
//!             .engine(Box::new(ChromeEngine::with_defaults()))
//!             .build()?,
//!     );
//!     sessions.warmup().await?;
//!
//!     let store = ArtifactStore::new(Arc::new(LocalStorageProvider::new("./temp")));
//!     store.init().await?;
//!
//!     let service = ConversionService::new(
//!         DocumentRenderer::new(sessions.clone(), WaitPolicy::default()),
//!         store,
//!     );
//!
//!     let request = RenderRequest::from_inputs(None, Some("<h1>Hi</h1>".into()), None)?;
//!     let outcome = service.create_pdf(request, "http://localhost:3000").await?;
//!     let pdf = service.download_pdf(&outcome.filename).await?;
//!     assert!(pdf.starts_with(b"%PDF-"));
//!
//!     sessions.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! Read by [`config::env::from_env`] (feature `env-config`), from the process
//! environment and an optional `app.env` file:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PORT` | 3000 | Listen port |
//! | `HOST` | 0.0.0.0 | Listen address |
//! | `APP_ENV` | development | anything but `development` switches to JSON logs |
//! | `STORAGE_TYPE` | local | `local` or `s3` |
//! | `STORAGE_LOCAL_PATH` | ./temp | Local artifact directory |
//! | `S3_BUCKET`, `S3_REGION`, `S3_ACCESS_KEY_ID`, `S3_SECRET_ACCESS_KEY`, `S3_ENDPOINT` | | S3 settings |
//! | `RENDER_TIMEOUT_SECONDS` | 30 | Document load timeout |
//! | `CHROME_PATH` | auto | Chrome binary |
//! | `KEEP_UPLOADS` | false | Persist uploaded HTML |
//! | `MAX_BODY_BYTES` | 10485760 | Request body limit |
//! | `RUST_LOG` | | Overrides the log filter |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `env-config` | Environment-based configuration |
//! | `axum-integration` | Axum HTTP surface and the server binary |
//! | `s3-storage` | S3 / object_store artifact provider |
//! | `test-utils` | Mock render engine for testing |
//!
//! ## Testing
//!
//! With `test-utils`, [`MockEngine`](engine::mock::MockEngine) stands in for
//! Chrome and exposes counters for launches, contexts, and exports:
//!
//! ```rust,ignore
//! use html2pdf_gateway::engine::mock::MockEngine;
//!
//! let engine = MockEngine::new();
//! let state = engine.state();
//! let sessions = SessionManager::builder().engine(Box::new(engine)).build()?;
//! ```

#![doc(html_root_url = "https://docs.rs/html2pdf-gateway/0.1.0")]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
pub mod layout;
pub mod logging;
pub mod manager;
pub mod prelude;
pub mod service;
pub mod session;
pub mod stats;
pub mod storage;
pub mod traits;

// ============================================================================
// Feature-gated modules
// ============================================================================

/// Web framework integrations (`axum-integration`).
#[cfg(feature = "axum-integration")]
pub mod integrations;

// ============================================================================
// Re-exports (Public API)
// ============================================================================

pub use config::{ConfigError, Environment, ServerConfig, ServerConfigBuilder, StorageConfig};
pub use engine::{ChromeEngine, EngineConnection, EngineContext, RenderEngine, create_chrome_options};
pub use error::{EngineError, Result};
pub use handle::ContextHandle;
pub use layout::{DocumentSource, Margins, PageLayout, WaitPolicy};
pub use manager::{SessionManager, SessionManagerBuilder};
pub use service::{ConversionService, DocumentRenderer, RenderRequest, ServiceError};
pub use session::RenderSession;
pub use stats::SessionStats;
pub use storage::{ArtifactStore, StorageError, StorageProvider};
pub use traits::Healthcheck;

#[cfg(feature = "env-config")]
pub use config::env::from_env;
