//! Rendering engine boundary.
//!
//! The engine is consumed as an opaque capability: "given a document and a
//! page setup, produce PDF bytes". This module defines that capability as
//! three traits, mirroring the lifecycle of a headless browser:
//!
//! ```text
//! RenderEngine ──launch()──▶ EngineConnection ──new_context()──▶ EngineContext
//!   (factory)                 (one browser process)               (one tab)
//!                              close()                             load()
//!                                                                  export_pdf()
//!                                                                  close()
//! ```
//!
//! All methods are **blocking**: the Chrome implementation talks to the
//! DevTools protocol synchronously. Callers in async code must run them on
//! the blocking pool (`tokio::task::spawn_blocking`), which is what
//! [`SessionManager`](crate::SessionManager) and
//! [`DocumentRenderer`](crate::service::DocumentRenderer) do.
//!
//! # Available Engines
//!
//! | Engine | Description |
//! |--------|-------------|
//! | [`ChromeEngine`] | Headless Chrome/Chromium via `headless_chrome` |
//! | [`mock::MockEngine`] | In-process fake for tests (feature-gated) |

mod chrome;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use chrome::{ChromeEngine, create_chrome_options};

use crate::error::Result;
use crate::layout::{DocumentSource, PageLayout, WaitPolicy};

/// Page a context opens before markup is injected into it.
pub const BLANK_PAGE: &str = "about:blank";

/// How a [`DocumentSource`] reaches a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStep<'a> {
    /// Network navigation to the URL.
    Navigate(&'a str),
    /// Open [`BLANK_PAGE`], then replace its document with the markup.
    /// The markup never travels inside a URL, so URL length caps do not
    /// apply to it.
    Inject(&'a str),
}

impl<'a> LoadStep<'a> {
    pub fn for_source(source: &'a DocumentSource) -> Self {
        match source {
            DocumentSource::Url(url) => Self::Navigate(url),
            DocumentSource::Markup(markup) => Self::Inject(markup),
        }
    }

    /// The only URL the context navigates to for this step.
    pub fn navigation_url(&self) -> &'a str {
        match self {
            Self::Navigate(url) => url,
            Self::Inject(_) => BLANK_PAGE,
        }
    }
}

/// Factory for engine connections.
///
/// # Thread Safety
///
/// Requires `Send + Sync` because the session manager shares the engine
/// with the blocking pool when it (re)launches a session.
pub trait RenderEngine: Send + Sync {
    /// Launch a new engine process and connect to it.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Configuration`](crate::EngineError::Configuration) for invalid launch options
    /// - [`EngineError::Launch`](crate::EngineError::Launch) when the process fails to start
    fn launch(&self) -> Result<Box<dyn EngineConnection>>;

    /// Engine name used in logs.
    fn name(&self) -> &'static str;
}

/// A live connection to one engine process.
///
/// Shared read-only by every concurrent render; each render opens its own
/// context from it.
pub trait EngineConnection: Send + Sync {
    /// Cheap liveness probe. Must not panic on a dead connection.
    fn is_alive(&self) -> bool;

    /// Open a fresh, isolated render context.
    fn new_context(&self) -> Result<Box<dyn EngineContext>>;

    /// Terminate the engine process. Idempotent.
    fn close(&self);
}

/// A single-use render context, comparable to one browser tab.
///
/// Never shared across requests. Owners must call [`close`](Self::close)
/// exactly once; [`ContextHandle`](crate::ContextHandle) enforces this.
pub trait EngineContext: Send {
    /// Load a document and wait until it is parsed and the network has been
    /// idle for [`WaitPolicy::network_idle`].
    ///
    /// Implementations follow [`LoadStep::for_source`]: URLs are navigated
    /// to, markup is injected into a [`BLANK_PAGE`].
    ///
    /// # Errors
    ///
    /// - [`EngineError::NavigationFailed`](crate::EngineError::NavigationFailed)
    /// - [`EngineError::NavigationTimeout`](crate::EngineError::NavigationTimeout)
    /// - [`EngineError::ContentLoadFailed`](crate::EngineError::ContentLoadFailed)
    fn load(&self, source: &DocumentSource, wait: &WaitPolicy) -> Result<()>;

    /// Export the loaded document as PDF bytes.
    fn export_pdf(&self, layout: &PageLayout) -> Result<Vec<u8>>;

    /// Release engine-side resources held by this context.
    fn close(&self) -> Result<()>;
}
