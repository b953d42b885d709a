//! Headless Chrome/Chromium engine implementation.
//!
//! This module provides [`ChromeEngine`], which launches headless Chrome
//! through the `headless_chrome` crate, plus the connection and context
//! types that adapt a `Browser` and a `Tab` to the engine traits.
//!
//! # Overview
//!
//! The engine handles:
//! - Chrome binary path detection (or custom path)
//! - Launch options for containerized, headless operation
//! - Inline markup injection into a blank page (`Page.setDocumentContent`)
//! - Network idle tracking through `Network.*` events
//! - Mapping page layouts onto `Page.printToPDF` options
//!
//! # Example
//!
//! ```rust,ignore
//! use html2pdf_gateway::ChromeEngine;
//!
//! // Auto-detect Chrome installation
//! let engine = ChromeEngine::with_defaults();
//!
//! // Or specify custom path
//! let engine = ChromeEngine::with_path("/usr/bin/chromium".to_string());
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::{Network, Page};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};

use super::{BLANK_PAGE, EngineConnection, EngineContext, LoadStep, RenderEngine};
use crate::error::{EngineError, Result};
use crate::layout::{DocumentSource, PageLayout, WaitPolicy};

/// How long the DevTools connection may stay silent before
/// `headless_chrome` drops it. A dropped connection is detected by the
/// liveness probe and relaunched.
const SESSION_IDLE_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Script probing whether the document finished parsing and loading subresources.
const READY_STATE_PROBE: &str = "document.readyState === 'complete'";

/// Factory for Chrome/Chromium engine connections.
///
/// Supports both auto-detection and custom Chrome binary paths.
///
/// # Thread Safety
///
/// This engine is `Send + Sync` and can be safely shared across threads.
pub struct ChromeEngine {
    /// Function that generates launch options for each launch.
    launch_options_fn: Box<dyn Fn() -> Result<LaunchOptions<'static>> + Send + Sync>,
}

impl ChromeEngine {
    /// Create engine with a custom launch options function.
    pub fn new<F>(launch_options_fn: F) -> Self
    where
        F: Fn() -> Result<LaunchOptions<'static>> + Send + Sync + 'static,
    {
        Self {
            launch_options_fn: Box::new(launch_options_fn),
        }
    }

    /// Create engine with auto-detected Chrome path.
    ///
    /// Lets `headless_chrome` search the usual installation paths on Linux,
    /// macOS and Windows.
    pub fn with_defaults() -> Self {
        log::debug!("Creating ChromeEngine with auto-detect");
        Self::new(|| {
            create_chrome_options(None).map_err(|e| EngineError::Configuration(e.to_string()))
        })
    }

    /// Create engine with custom Chrome binary path.
    pub fn with_path(chrome_path: String) -> Self {
        log::debug!("Creating ChromeEngine with custom path: {}", chrome_path);
        Self::new(move || {
            create_chrome_options(Some(&chrome_path))
                .map_err(|e| EngineError::Configuration(e.to_string()))
        })
    }

    /// Create engine from an optional path, auto-detecting when `None`.
    pub fn from_path(chrome_path: Option<String>) -> Self {
        match chrome_path {
            Some(path) => Self::with_path(path),
            None => Self::with_defaults(),
        }
    }
}

impl RenderEngine for ChromeEngine {
    /// Launch a new Chrome process.
    ///
    /// # Errors
    ///
    /// * [`EngineError::Configuration`] if launch options generation fails.
    /// * [`EngineError::Launch`] if Chrome fails to start.
    fn launch(&self) -> Result<Box<dyn EngineConnection>> {
        log::trace!("ChromeEngine::launch() called");

        let options = (self.launch_options_fn)()?;

        log::debug!("Launching Chrome browser...");
        let browser = Browser::new(options).map_err(|e| {
            log::error!("❌ Chrome launch failed: {}", e);
            EngineError::Launch(e.to_string())
        })?;

        Ok(Box::new(ChromeConnection {
            browser: Mutex::new(Some(Arc::new(browser))),
        }))
    }

    fn name(&self) -> &'static str {
        "chrome"
    }
}

/// Create Chrome launch options with optional custom path.
///
/// # Chrome Flags Applied
///
/// ## Containers
/// - `--no-sandbox`, `--disable-setuid-sandbox` - no user namespaces needed
/// - `--no-zygote`, `--no-first-run`
/// - `--disable-dev-shm-usage` - Use /tmp instead of /dev/shm
///
/// ## GPU and Rendering
/// - `--disable-gpu-compositing`, `--disable-software-rasterizer`
/// - `--disable-webgl`, `--disable-webgl2`
///
/// ## Disabled Features
/// - `--disable-extensions`, `--disable-plugins`, `--disable-sync`,
///   `--disable-default-apps`, `--disable-crash-reporter`
///
/// ## Stability
/// - `--disable-background-timer-throttling`
/// - `--disable-backgrounding-occluded-windows`
/// - `--disable-renderer-backgrounding`
/// - `--disable-hang-monitor`
/// - `--disable-ipc-flooding-protection`
///
/// Web security stays enabled; submitted markup is untrusted.
pub fn create_chrome_options(
    chrome_path: Option<&str>,
) -> std::result::Result<LaunchOptions<'static>, Box<dyn std::error::Error + Send + Sync>> {
    match chrome_path {
        Some(path) => log::debug!("Creating Chrome options with custom path: {}", path),
        None => log::debug!("Creating Chrome options (auto-detect browser)"),
    }

    let mut builder = LaunchOptions::default_builder();

    if let Some(path) = chrome_path {
        builder.path(Some(path.to_string().into()));
    }

    builder
        .headless(true)
        .sandbox(false)
        .disable_default_args(true)
        // Sessions sit idle between requests
        .idle_browser_timeout(Duration::from_secs(SESSION_IDLE_TIMEOUT_SECS))
        .args(vec![
            // ===== Containers =====
            "--disable-setuid-sandbox".as_ref(),
            "--no-zygote".as_ref(),
            "--no-first-run".as_ref(),
            "--disable-dev-shm-usage".as_ref(),
            "--disable-crash-reporter".as_ref(),
            // ===== GPU and Rendering Flags =====
            "--disable-gpu-compositing".as_ref(),
            "--disable-software-rasterizer".as_ref(),
            "--disable-webgl".as_ref(),
            "--disable-webgl2".as_ref(),
            // ===== Disable Unnecessary Features =====
            "--disable-extensions".as_ref(),
            "--disable-plugins".as_ref(),
            "--disable-sync".as_ref(),
            "--disable-default-apps".as_ref(),
            // ===== Stability =====
            "--disable-background-timer-throttling".as_ref(),
            "--disable-backgrounding-occluded-windows".as_ref(),
            "--disable-renderer-backgrounding".as_ref(),
            "--disable-hang-monitor".as_ref(),
            "--disable-ipc-flooding-protection".as_ref(),
        ])
        .build()
        .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
            let path_msg = chrome_path.unwrap_or("auto-detect");
            log::error!(
                "❌ Failed to build Chrome launch options (path: {}): {}",
                path_msg,
                e
            );
            e.into()
        })
}

// ============================================================================
// Connection
// ============================================================================

/// A launched Chrome process.
///
/// The browser process is killed when the inner `Browser` is dropped, so
/// closing simply takes it out of the slot.
struct ChromeConnection {
    browser: Mutex<Option<Arc<Browser>>>,
}

impl ChromeConnection {
    /// Clone the browser out of the slot so no lock is held during I/O.
    fn browser(&self) -> Option<Arc<Browser>> {
        self.browser.lock().ok().and_then(|guard| guard.clone())
    }
}

impl EngineConnection for ChromeConnection {
    fn is_alive(&self) -> bool {
        match self.browser() {
            Some(browser) => match browser.get_version() {
                Ok(_) => true,
                Err(e) => {
                    log::warn!("Chrome liveness probe failed: {}", e);
                    false
                }
            },
            None => false,
        }
    }

    fn new_context(&self) -> Result<Box<dyn EngineContext>> {
        let browser = self
            .browser()
            .ok_or_else(|| EngineError::ContextCreation("browser already closed".to_string()))?;

        let tab = browser.new_tab().map_err(|e| {
            log::error!("❌ Failed to create tab: {}", e);
            EngineError::ContextCreation(e.to_string())
        })?;

        let network = Arc::new(Mutex::new(NetworkIdle::new(Instant::now())));
        let tracker = Arc::clone(&network);
        tab.add_event_listener(Arc::new(move |event: &Event| {
            if let Ok(mut network) = tracker.lock() {
                network.observe(event, Instant::now());
            }
        }))
        .and_then(|_| {
            tab.call_method(Network::Enable {
                max_total_buffer_size: None,
                max_resource_buffer_size: None,
                max_post_data_size: None,
                report_direct_socket_traffic: None,
                enable_durable_messages: None,
            })
        })
        .map_err(|e| {
            log::error!("❌ Failed to enable network tracking: {}", e);
            EngineError::ContextCreation(e.to_string())
        })?;

        Ok(Box::new(ChromeContext { tab, network }))
    }

    fn close(&self) {
        match self.browser.lock() {
            Ok(mut guard) => {
                if guard.take().is_some() {
                    log::debug!("Chrome process released");
                }
            }
            Err(e) => log::warn!("Chrome connection lock poisoned during close: {}", e),
        }
    }
}

// ============================================================================
// Context
// ============================================================================

/// In-flight request bookkeeping fed by `Network.*` events.
#[derive(Debug)]
struct NetworkIdle {
    in_flight: HashSet<String>,
    last_activity: Instant,
}

impl NetworkIdle {
    fn new(now: Instant) -> Self {
        Self {
            in_flight: HashSet::new(),
            last_activity: now,
        }
    }

    fn observe(&mut self, event: &Event, now: Instant) {
        match event {
            Event::NetworkRequestWillBeSent(ev) => self.request_started(&ev.params.request_id, now),
            Event::NetworkLoadingFinished(ev) => self.request_done(&ev.params.request_id, now),
            Event::NetworkLoadingFailed(ev) => self.request_done(&ev.params.request_id, now),
            _ => {}
        }
    }

    /// Redirects reuse the request id, so a redirected request counts once.
    fn request_started(&mut self, request_id: &str, now: Instant) {
        self.in_flight.insert(request_id.to_string());
        self.last_activity = now;
    }

    fn request_done(&mut self, request_id: &str, now: Instant) {
        if self.in_flight.remove(request_id) {
            self.last_activity = now;
        }
    }

    fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn is_idle(&self, window: Duration, now: Instant) -> bool {
        self.in_flight.is_empty() && now.saturating_duration_since(self.last_activity) >= window
    }
}

struct ChromeContext {
    tab: Arc<Tab>,
    network: Arc<Mutex<NetworkIdle>>,
}

impl ChromeContext {
    /// Poll until `readyState == complete` and the network has been idle for
    /// `wait.network_idle`, or the deadline passes.
    fn wait_until_settled(&self, started: Instant, wait: &WaitPolicy) -> Result<()> {
        let mut ready = false;
        loop {
            if !ready {
                ready = self
                    .tab
                    .evaluate(READY_STATE_PROBE, false)
                    .map(|result| result.value.and_then(|v| v.as_bool()).unwrap_or(false))
                    .unwrap_or(false);
            }

            let (idle, in_flight) = match self.network.lock() {
                Ok(network) => (
                    network.is_idle(wait.network_idle, Instant::now()),
                    network.in_flight(),
                ),
                Err(_) => (true, 0),
            };

            if ready && idle {
                log::trace!("Document settled after {:?}", started.elapsed());
                return Ok(());
            }

            if started.elapsed() >= wait.timeout {
                let reason = if ready {
                    format!(
                        "network not idle after {}s ({} requests in flight)",
                        wait.timeout.as_secs(),
                        in_flight
                    )
                } else {
                    format!("document not ready after {}s", wait.timeout.as_secs())
                };
                return Err(EngineError::NavigationTimeout(reason));
            }

            std::thread::sleep(wait.poll_interval);
        }
    }

    /// Open a blank page and replace its document with `markup`.
    fn inject(&self, markup: &str) -> Result<()> {
        self.tab
            .navigate_to(BLANK_PAGE)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(content_error)?;

        let frame_id = self
            .tab
            .call_method(Page::GetFrameTree(None))
            .map_err(content_error)?
            .frame_tree
            .frame
            .id;

        log::trace!("Injecting {} bytes of markup into frame {}", markup.len(), frame_id);
        self.tab
            .call_method(Page::SetDocumentContent {
                frame_id,
                html: markup.to_string(),
            })
            .map_err(content_error)?;
        Ok(())
    }
}

impl EngineContext for ChromeContext {
    fn load(&self, source: &DocumentSource, wait: &WaitPolicy) -> Result<()> {
        let started = Instant::now();
        self.tab.set_default_timeout(wait.timeout);

        match LoadStep::for_source(source) {
            LoadStep::Navigate(url) => {
                log::trace!("Navigating to URL: {}", truncate_url(url, 100));
                self.tab.navigate_to(url).map_err(|e| {
                    log::error!("❌ Failed to navigate to URL: {}", e);
                    EngineError::NavigationFailed(e.to_string())
                })?;
                self.tab.wait_until_navigated().map_err(|e| {
                    log::error!("❌ Navigation timeout: {}", e);
                    EngineError::NavigationTimeout(e.to_string())
                })?;
            }
            LoadStep::Inject(markup) => self.inject(markup)?,
        }

        self.wait_until_settled(started, wait)
    }

    fn export_pdf(&self, layout: &PageLayout) -> Result<Vec<u8>> {
        self.tab
            .print_to_pdf(Some(build_print_options(layout)))
            .map_err(|e| {
                log::error!("❌ Failed to generate PDF: {}", e);
                EngineError::ExportFailed(e.to_string())
            })
    }

    fn close(&self) -> Result<()> {
        self.tab
            .close(true)
            .map(|_| ())
            .map_err(|e| EngineError::ContextCreation(format!("tab close failed: {}", e)))
    }
}

fn content_error<E: std::fmt::Display>(e: E) -> EngineError {
    log::error!("❌ Failed to load inline markup: {}", e);
    EngineError::ContentLoadFailed(e.to_string())
}

fn build_print_options(layout: &PageLayout) -> PrintToPdfOptions {
    PrintToPdfOptions {
        landscape: Some(layout.landscape),
        display_header_footer: Some(false),
        print_background: Some(layout.print_background),
        paper_width: Some(PageLayout::mm_to_inches(layout.paper_width_mm)),
        paper_height: Some(PageLayout::mm_to_inches(layout.paper_height_mm)),
        margin_top: Some(PageLayout::mm_to_inches(layout.margins.top)),
        margin_bottom: Some(PageLayout::mm_to_inches(layout.margins.bottom)),
        margin_left: Some(PageLayout::mm_to_inches(layout.margins.left)),
        margin_right: Some(PageLayout::mm_to_inches(layout.margins.right)),
        prefer_css_page_size: Some(layout.prefer_css_page_size),
        ..Default::default()
    }
}

fn truncate_url(url: &str, max_len: usize) -> String {
    match url.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}...", &url[..idx]),
        None => url.to_string(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Construction never launches Chrome.
    #[test]
    fn test_chrome_engine_creation() {
        let engine = ChromeEngine::with_defaults();
        assert_eq!(engine.name(), "chrome");

        let _engine = ChromeEngine::with_path("/custom/chrome/path".to_string());
        let _engine = ChromeEngine::from_path(None);
    }

    #[test]
    fn test_create_chrome_options() {
        let result = create_chrome_options(None);
        assert!(result.is_ok(), "Auto-detect options should build: {:?}", result.err());

        let result = create_chrome_options(Some("/custom/chrome/path"));
        assert!(result.is_ok(), "Custom path options should build: {:?}", result.err());
    }

    #[test]
    fn test_print_options_css_driven() {
        let options = build_print_options(&PageLayout::css_driven());
        assert_eq!(options.prefer_css_page_size, Some(true));
        assert_eq!(options.print_background, Some(true));
        assert_eq!(options.margin_top, Some(0.0));
        assert_eq!(options.margin_left, Some(0.0));
        assert_eq!(options.display_header_footer, Some(false));
    }

    #[test]
    fn test_print_options_fixed_margins() {
        let options = build_print_options(&PageLayout::fixed_margins());
        assert_eq!(options.prefer_css_page_size, Some(false));
        let top = options.margin_top.unwrap();
        let left = options.margin_left.unwrap();
        assert!((top - 20.0 / 25.4).abs() < 1e-9);
        assert!((left - 15.0 / 25.4).abs() < 1e-9);
    }

    #[test]
    fn test_network_idle_requires_quiet_window() {
        let t0 = Instant::now();
        let window = Duration::from_millis(500);
        let mut network = NetworkIdle::new(t0);

        assert!(!network.is_idle(window, t0 + Duration::from_millis(100)));
        assert!(network.is_idle(window, t0 + window));

        network.request_started("1", t0 + Duration::from_millis(600));
        network.request_started("2", t0 + Duration::from_millis(650));
        assert_eq!(network.in_flight(), 2);
        assert!(!network.is_idle(window, t0 + Duration::from_secs(5)));

        network.request_done("1", t0 + Duration::from_millis(700));
        network.request_done("2", t0 + Duration::from_millis(900));
        assert_eq!(network.in_flight(), 0);
        assert!(!network.is_idle(window, t0 + Duration::from_millis(1200)));
        assert!(network.is_idle(window, t0 + Duration::from_millis(1400)));
    }

    #[test]
    fn test_network_idle_ignores_unknown_completions() {
        let t0 = Instant::now();
        let window = Duration::from_millis(500);
        let mut network = NetworkIdle::new(t0);

        network.request_started("a", t0);
        network.request_started("a", t0 + Duration::from_millis(10));
        assert_eq!(network.in_flight(), 1);

        network.request_done("a", t0 + Duration::from_millis(20));
        network.request_done("stale", t0 + Duration::from_millis(400));
        assert!(network.is_idle(window, t0 + Duration::from_millis(520)));
    }

    #[test]
    fn test_truncate_url() {
        assert_eq!(truncate_url("https://example.com", 50), "https://example.com");
        let truncated = truncate_url("https://example.com/very/long/path", 10);
        assert_eq!(truncated, "https://ex...");
    }
}
