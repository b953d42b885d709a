//! RAII handle for render contexts.
//!
//! This module provides [`ContextHandle`], which owns one engine context
//! (one tab) for the duration of a single render and guarantees it is
//! closed exactly once, on every exit path:
//!
//! - explicit [`close`](ContextHandle::close) on success
//! - `Drop` on early return, error or panic
//!
//! # Usage Pattern
//!
//! ```rust,ignore
//! let session = manager.acquire().await?;
//!
//! let pdf = tokio::task::spawn_blocking(move || {
//!     let ctx = ContextHandle::open(&session)?;
//!     ctx.load(&source, &wait)?;          // `?` here still closes the tab
//!     let bytes = ctx.export_pdf(&layout)?;
//!     ctx.close()?;
//!     Ok::<_, EngineError>(bytes)
//! })
//! .await??;
//! ```
//!
//! All methods are blocking.

use std::sync::Arc;

use crate::engine::EngineContext;
use crate::error::Result;
use crate::layout::{DocumentSource, PageLayout, WaitPolicy};
use crate::session::RenderSession;

/// Owns one render context opened from a [`RenderSession`].
///
/// # Thread Safety
///
/// `ContextHandle` is `Send` but not `Sync`: a context belongs to exactly
/// one render call.
pub struct ContextHandle {
    /// `Option` so both `close` and `Drop` can take it.
    context: Option<Box<dyn EngineContext>>,
    session_id: u64,
}

impl ContextHandle {
    /// Open a fresh context on `session`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ContextCreation`](crate::EngineError::ContextCreation)
    /// and marks the session dead, so the next acquisition relaunches.
    pub fn open(session: &Arc<RenderSession>) -> Result<Self> {
        match session.connection().new_context() {
            Ok(context) => {
                log::debug!("Opened render context on session {}", session.id());
                Ok(Self {
                    context: Some(context),
                    session_id: session.id(),
                })
            }
            Err(e) => {
                log::error!(
                    "❌ Failed to open render context on session {}: {}",
                    session.id(),
                    e
                );
                session.mark_dead();
                Err(e)
            }
        }
    }

    /// Id of the session this context belongs to.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Load a document and wait for it to settle.
    pub fn load(&self, source: &DocumentSource, wait: &WaitPolicy) -> Result<()> {
        self.context()?.load(source, wait)
    }

    /// Export the loaded document as PDF bytes.
    pub fn export_pdf(&self, layout: &PageLayout) -> Result<Vec<u8>> {
        self.context()?.export_pdf(layout)
    }

    /// Close the context now and report the engine's answer.
    ///
    /// Consumes the handle, so `Drop` has nothing left to close.
    pub fn close(mut self) -> Result<()> {
        match self.context.take() {
            Some(context) => context.close(),
            None => Ok(()),
        }
    }

    fn context(&self) -> Result<&dyn EngineContext> {
        self.context.as_deref().ok_or_else(|| {
            crate::EngineError::ContextCreation("render context already closed".to_string())
        })
    }
}

impl Drop for ContextHandle {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            log::debug!(
                "ContextHandle on session {} dropped without close, closing...",
                self.session_id
            );
            if let Err(e) = context.close() {
                log::warn!("⚠️ Failed to close render context: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextHandle")
            .field("session_id", &self.session_id)
            .field("open", &self.context.is_some())
            .finish()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
