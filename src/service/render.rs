//! Document renderer: one isolated render context per call.
//!
//! ```text
//! render_from_url / render_from_html
//!   │
//!   ├─ SessionManager::acquire()          (async, shared session)
//!   └─ spawn_blocking
//!        ├─ ContextHandle::open()         (one tab)
//!        ├─ load(source, wait policy)
//!        ├─ export_pdf(layout)
//!        └─ close()                       (or Drop on any error)
//! ```
//!
//! No retries: a failed render is reported as is.

use std::sync::Arc;

use super::types::{ServiceError, validate_url};
use crate::error::EngineError;
use crate::handle::ContextHandle;
use crate::layout::{DocumentSource, PageLayout, WaitPolicy};
use crate::manager::SessionManager;

/// Renders documents on the shared session.
#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    sessions: Arc<SessionManager>,
    wait: WaitPolicy,
}

impl DocumentRenderer {
    pub fn new(sessions: Arc<SessionManager>, wait: WaitPolicy) -> Self {
        Self { sessions, wait }
    }

    /// Render inline markup. Callers normally pass
    /// [`PageLayout::css_driven`].
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidInput`] for empty markup
    /// - [`ServiceError::SessionUnavailable`] if no session can be obtained
    /// - [`ServiceError::RenderFailed`] for any engine failure
    pub async fn render_from_html(
        &self,
        markup: &str,
        layout: &PageLayout,
    ) -> Result<Vec<u8>, ServiceError> {
        if markup.trim().is_empty() {
            return Err(ServiceError::InvalidInput("HTML content is empty".to_string()));
        }
        self.render(DocumentSource::Markup(markup.to_string()), layout.clone())
            .await
    }

    /// Navigate to `url` and render it. Callers normally pass
    /// [`PageLayout::fixed_margins`].
    ///
    /// # Errors
    ///
    /// As [`render_from_html`](Self::render_from_html), with
    /// [`ServiceError::InvalidInput`] for non-absolute or non-http(s) URLs.
    pub async fn render_from_url(
        &self,
        url: &str,
        layout: &PageLayout,
    ) -> Result<Vec<u8>, ServiceError> {
        let url = validate_url(url)?;
        self.render(DocumentSource::Url(url), layout.clone()).await
    }

    async fn render(
        &self,
        source: DocumentSource,
        layout: PageLayout,
    ) -> Result<Vec<u8>, ServiceError> {
        let session = self.sessions.acquire().await.map_err(|e| {
            log::error!("❌ No render session available: {}", e);
            ServiceError::SessionUnavailable(e)
        })?;

        let kind = source.kind();
        let wait = self.wait;

        let result = tokio::task::spawn_blocking(move || {
            let ctx = ContextHandle::open(&session)?;
            ctx.load(&source, &wait)?;
            let pdf = ctx.export_pdf(&layout)?;
            if let Err(e) = ctx.close() {
                log::warn!("⚠️ Render context close reported an error: {}", e);
            }
            Ok::<_, EngineError>(pdf)
        })
        .await
        .map_err(|e| ServiceError::Internal(format!("render task failed: {}", e)))?;

        match result {
            Ok(pdf) => {
                log::debug!("Rendered {} document ({} bytes)", kind, pdf.len());
                Ok(pdf)
            }
            Err(e) if e.is_document_error() => {
                log::warn!("⚠️ Rendering {} document failed: {}", kind, e);
                Err(ServiceError::RenderFailed(e))
            }
            Err(e) => {
                log::error!(
                    "❌ {} engine failed while rendering {} document: {}",
                    self.sessions.engine_name(),
                    kind,
                    e
                );
                Err(ServiceError::RenderFailed(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockEngine;

    fn renderer(engine: MockEngine) -> DocumentRenderer {
        let sessions = SessionManager::builder()
            .engine(Box::new(engine))
            .build()
            .unwrap();
        DocumentRenderer::new(Arc::new(sessions), WaitPolicy::default())
    }

    #[tokio::test]
    async fn test_render_html_uses_given_layout() {
        let engine = MockEngine::new();
        let state = engine.state();
        let renderer = renderer(engine);

        let pdf = renderer
            .render_from_html("<h1>Hi</h1>", &PageLayout::css_driven())
            .await
            .unwrap();

        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(state.last_layout(), Some(PageLayout::css_driven()));
        assert_eq!(state.contexts_opened(), state.contexts_closed());
    }

    #[tokio::test]
    async fn test_render_failure_still_closes_context() {
        let engine = MockEngine::new();
        let state = engine.state();
        state.set_fail_export(true);
        let renderer = renderer(engine);

        let result = renderer
            .render_from_url("https://example.com", &PageLayout::fixed_margins())
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::RenderFailed(EngineError::ExportFailed(_)))
        ));
        assert_eq!(state.contexts_opened(), 1);
        assert_eq!(state.contexts_closed(), 1);
    }

    #[tokio::test]
    async fn test_large_markup_is_injected() {
        let engine = MockEngine::new();
        let state = engine.state();
        let renderer = renderer(engine);
        let markup = format!("<html><body>{}</body></html>", "a".repeat(3 * 1024 * 1024));

        let pdf = renderer
            .render_from_html(&markup, &PageLayout::css_driven())
            .await
            .unwrap();

        assert!(pdf.len() > 3 * 1024 * 1024);
        assert_eq!(state.injections(), 1);
        assert_eq!(state.navigations(), vec![crate::engine::BLANK_PAGE]);
    }

    #[tokio::test]
    async fn test_launch_failure_is_session_unavailable() {
        let renderer = renderer(MockEngine::always_fails("no chrome"));

        let result = renderer
            .render_from_html("<p>x</p>", &PageLayout::css_driven())
            .await;
        assert!(matches!(result, Err(ServiceError::SessionUnavailable(_))));
    }

    #[tokio::test]
    async fn test_rejects_bad_input_before_acquiring() {
        let engine = MockEngine::new();
        let state = engine.state();
        let renderer = renderer(engine);

        assert!(matches!(
            renderer.render_from_html("  ", &PageLayout::css_driven()).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            renderer
                .render_from_url("not a url", &PageLayout::fixed_margins())
                .await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert_eq!(state.launches(), 0);
    }
}
