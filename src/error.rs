//! Error types for the render engine and session layer.
//!
//! This module provides [`EngineError`], a unified error type for everything
//! that talks to the external rendering engine (launching, health checks,
//! opening contexts, loading documents, exporting PDF), and a convenient
//! [`Result`] type alias.
//!
//! Service-level errors that reach HTTP callers live in
//! [`ServiceError`](crate::service::ServiceError); engine errors are wrapped
//! into it by the renderer.
//!
//! # Example
//!
//! ```rust
//! use html2pdf_gateway::{EngineError, Result};
//!
//! fn export() -> Result<Vec<u8>> {
//!     Err(EngineError::ExportFailed("printer on fire".to_string()))
//! }
//!
//! match export() {
//!     Ok(pdf) => println!("Generated {} bytes", pdf.len()),
//!     Err(EngineError::ShuttingDown) => println!("Shutting down"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

/// Errors that can occur while driving the rendering engine.
///
/// Each variant carries the engine's own message so logs keep the detail,
/// while the service layer decides what the HTTP caller gets to see.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The engine process could not be launched.
    ///
    /// # Common Causes
    ///
    /// - Chrome/Chromium binary not found or not installed
    /// - Invalid `CHROME_PATH`
    /// - Missing shared libraries inside a container
    #[error("Failed to launch render engine: {0}")]
    Launch(String),

    /// A liveness probe against a running session failed.
    #[error("Render session health check failed: {0}")]
    HealthCheckFailed(String),

    /// A fresh render context (tab) could not be opened.
    ///
    /// Usually means the engine connection died; the session is marked dead
    /// and the next acquisition relaunches it.
    #[error("Failed to open render context: {0}")]
    ContextCreation(String),

    /// Navigation to a URL failed (DNS, refused connection, bad scheme...).
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// The document did not finish loading within the wait policy timeout.
    #[error("Navigation timeout: {0}")]
    NavigationTimeout(String),

    /// Inline markup could not be injected into the context.
    #[error("Content load failed: {0}")]
    ContentLoadFailed(String),

    /// The engine failed to produce PDF bytes.
    #[error("PDF export failed: {0}")]
    ExportFailed(String),

    /// Operation attempted after [`SessionManager::shutdown`](crate::SessionManager::shutdown).
    #[error("Render session manager is shutting down")]
    ShuttingDown,

    /// Invalid engine configuration (launch options, paths).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    /// Whether this error came from loading or exporting a document, as
    /// opposed to the session lifecycle.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            Self::NavigationFailed(_)
                | Self::NavigationTimeout(_)
                | Self::ContentLoadFailed(_)
                | Self::ExportFailed(_)
        )
    }
}

/// Convenience conversion from [`String`] to [`EngineError::Configuration`].
impl From<String> for EngineError {
    fn from(msg: String) -> Self {
        EngineError::Configuration(msg)
    }
}

/// Convenience conversion from `&str` to [`EngineError::Configuration`].
impl From<&str> for EngineError {
    fn from(msg: &str) -> Self {
        EngineError::Configuration(msg.to_string())
    }
}

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

// ============================================================================
// Unit Tests
// ============================================================================
