//! Mock render engine for testing.
//!
//! This module provides [`MockEngine`], an in-process implementation of the
//! engine traits that never starts a browser. It can be configured to fail
//! at launch, at navigation or at export, and it counts every launch and
//! every context so tests can verify session reuse and cleanup.
//!
//! # Feature Flag
//!
//! This module is only available when:
//! - The `test-utils` feature is enabled, OR
//! - During testing (`#[cfg(test)]`)
//!
//! # Output
//!
//! Exported "PDFs" are a short `%PDF-` header followed by a line naming the
//! loaded source, so tests can tell which input path was rendered:
//!
//! ```text
//! %PDF-1.4
//! %source: url:https://example.com
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_gateway::engine::mock::MockEngine;
//!
//! // Engine that cannot launch
//! let engine = MockEngine::always_fails("Chrome not installed");
//!
//! // Engine whose launches succeed, with shared counters
//! let engine = MockEngine::new();
//! let state = engine.state();
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{EngineConnection, EngineContext, LoadStep, RenderEngine};
use crate::error::{EngineError, Result};
use crate::layout::{DocumentSource, PageLayout, WaitPolicy};

/// Counters and switches shared between a [`MockEngine`] and everything it
/// produced.
///
/// Obtain it with [`MockEngine::state`] before moving the engine into a
/// [`SessionManager`](crate::SessionManager).
#[derive(Debug, Default)]
pub struct MockState {
    launches: AtomicUsize,
    contexts_opened: AtomicUsize,
    contexts_closed: AtomicUsize,
    exports: AtomicUsize,
    /// Bumped by [`kill_sessions`](Self::kill_sessions); connections launched
    /// in an older generation report themselves dead.
    generation: AtomicUsize,
    fail_navigation: AtomicBool,
    fail_export: AtomicBool,
    last_layout: Mutex<Option<PageLayout>>,
    navigations: Mutex<Vec<String>>,
    injections: AtomicUsize,
}

impl MockState {
    /// Number of launch attempts, successful or not.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Number of contexts handed out.
    pub fn contexts_opened(&self) -> usize {
        self.contexts_opened.load(Ordering::SeqCst)
    }

    /// Number of contexts closed.
    pub fn contexts_closed(&self) -> usize {
        self.contexts_closed.load(Ordering::SeqCst)
    }

    /// Number of successful PDF exports.
    pub fn exports(&self) -> usize {
        self.exports.load(Ordering::SeqCst)
    }

    /// Simulate a crash of every connection launched so far.
    pub fn kill_sessions(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Make subsequent loads fail with [`EngineError::NavigationFailed`].
    pub fn set_fail_navigation(&self, fail: bool) {
        self.fail_navigation.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent exports fail with [`EngineError::ExportFailed`].
    pub fn set_fail_export(&self, fail: bool) {
        self.fail_export.store(fail, Ordering::SeqCst);
    }

    /// Layout used by the most recent export.
    pub fn last_layout(&self) -> Option<PageLayout> {
        self.last_layout.lock().ok().and_then(|guard| guard.clone())
    }

    /// Every URL a context navigated to, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.navigations
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Number of documents injected as markup.
    pub fn injections(&self) -> usize {
        self.injections.load(Ordering::SeqCst)
    }

    fn generation(&self) -> usize {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Mock engine for testing without Chrome.
///
/// # Thread Safety
///
/// `Send + Sync`; all state lives in atomics behind a shared [`MockState`].
pub struct MockEngine {
    should_fail: bool,
    error_message: String,
    launch_delay: Option<Duration>,
    state: Arc<MockState>,
}

impl MockEngine {
    /// Engine whose launches always succeed.
    pub fn new() -> Self {
        Self {
            should_fail: false,
            error_message: String::new(),
            launch_delay: None,
            state: Arc::new(MockState::default()),
        }
    }

    /// Engine whose launches always fail with the given message.
    ///
    /// ```rust,ignore
    /// let engine = MockEngine::always_fails("Chrome not installed");
    /// assert!(engine.launch().is_err());
    /// ```
    pub fn always_fails<S: Into<String>>(message: S) -> Self {
        Self {
            should_fail: true,
            error_message: message.into(),
            ..Self::new()
        }
    }

    /// Sleep inside every launch, to widen the window for concurrent
    /// acquisitions.
    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = Some(delay);
        self
    }

    /// Shared handle to the counters, usable after the engine is moved.
    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.state)
    }

    /// Number of launch attempts.
    pub fn launch_count(&self) -> usize {
        self.state.launches()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine for MockEngine {
    fn launch(&self) -> Result<Box<dyn EngineConnection>> {
        let count = self.state.launches.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.launch_delay {
            std::thread::sleep(delay);
        }

        if self.should_fail {
            log::debug!("MockEngine: Returning configured launch failure");
            return Err(EngineError::Launch(self.error_message.clone()));
        }

        log::debug!("MockEngine: Launch #{} succeeded", count + 1);

        Ok(Box::new(MockConnection {
            generation: self.state.generation(),
            closed: AtomicBool::new(false),
            state: Arc::clone(&self.state),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine")
            .field("should_fail", &self.should_fail)
            .field("error_message", &self.error_message)
            .field("launches", &self.state.launches())
            .finish()
    }
}

struct MockConnection {
    generation: usize,
    closed: AtomicBool,
    state: Arc<MockState>,
}

impl EngineConnection for MockConnection {
    fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.generation == self.state.generation()
    }

    fn new_context(&self) -> Result<Box<dyn EngineContext>> {
        if !self.is_alive() {
            return Err(EngineError::ContextCreation(
                "connection is closed".to_string(),
            ));
        }
        self.state.contexts_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockContext {
            loaded: Mutex::new(None),
            state: Arc::clone(&self.state),
        }))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct MockContext {
    loaded: Mutex<Option<DocumentSource>>,
    state: Arc<MockState>,
}

impl EngineContext for MockContext {
    fn load(&self, source: &DocumentSource, _wait: &WaitPolicy) -> Result<()> {
        if self.state.fail_navigation.load(Ordering::SeqCst) {
            return Err(EngineError::NavigationFailed(format!(
                "mock refused to load {}",
                source.kind()
            )));
        }

        let step = LoadStep::for_source(source);
        if let Ok(mut navigations) = self.state.navigations.lock() {
            navigations.push(step.navigation_url().to_string());
        }
        if let LoadStep::Inject(_) = step {
            self.state.injections.fetch_add(1, Ordering::SeqCst);
        }

        let mut loaded = self
            .loaded
            .lock()
            .map_err(|_| EngineError::ContentLoadFailed("poisoned".to_string()))?;
        *loaded = Some(source.clone());
        Ok(())
    }

    fn export_pdf(&self, layout: &PageLayout) -> Result<Vec<u8>> {
        if self.state.fail_export.load(Ordering::SeqCst) {
            return Err(EngineError::ExportFailed("mock export failure".to_string()));
        }

        let loaded = self
            .loaded
            .lock()
            .map_err(|_| EngineError::ExportFailed("poisoned".to_string()))?;
        let label = match loaded.as_ref() {
            Some(DocumentSource::Url(url)) => format!("url:{}", url),
            Some(DocumentSource::Markup(markup)) => format!("markup:{}", markup),
            None => return Err(EngineError::ExportFailed("nothing loaded".to_string())),
        };

        if let Ok(mut last) = self.state.last_layout.lock() {
            *last = Some(layout.clone());
        }
        self.state.exports.fetch_add(1, Ordering::SeqCst);

        Ok(format!("%PDF-1.4\n%source: {}\n%%EOF\n", label).into_bytes())
    }

    fn close(&self) -> Result<()> {
        self.state.contexts_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
