//! Page setup and load policy shared by the renderer and the engines.
//!
//! Two layout presets exist because they change the visual output, not just
//! the code path:
//!
//! | Preset | Used for | Margins | CSS `@page` size |
//! |--------|----------|---------|------------------|
//! | [`PageLayout::css_driven`] | inline / uploaded HTML | none | preferred |
//! | [`PageLayout::fixed_margins`] | URLs | 20/20/15/15 mm | ignored |
//!
//! Documents submitted as markup are expected to define their own print
//! layout; arbitrary web pages usually are not designed for print and get
//! fixed margins instead.

use std::time::Duration;

/// Width of an A4 sheet in millimetres.
pub const A4_WIDTH_MM: f64 = 210.0;

/// Height of an A4 sheet in millimetres.
pub const A4_HEIGHT_MM: f64 = 297.0;

/// Default bound on document loading, in seconds.
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 30;

/// Interval between readiness probes while waiting for a document.
const READY_POLL_INTERVAL_MS: u64 = 200;

/// Quiet period with zero in-flight requests that counts as "network settled".
pub const DEFAULT_NETWORK_IDLE_MS: u64 = 500;

const MM_PER_INCH: f64 = 25.4;

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Margins {
    /// No margins at all.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Page setup handed to [`EngineContext::export_pdf`](crate::engine::EngineContext::export_pdf).
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub paper_width_mm: f64,
    pub paper_height_mm: f64,
    pub margins: Margins,
    pub print_background: bool,
    /// Let a CSS `@page { size: ... }` rule override the paper size.
    pub prefer_css_page_size: bool,
    pub landscape: bool,
}

impl PageLayout {
    /// Margin-free A4 layout where the document's print CSS is in charge.
    pub fn css_driven() -> Self {
        Self {
            paper_width_mm: A4_WIDTH_MM,
            paper_height_mm: A4_HEIGHT_MM,
            margins: Margins::zero(),
            print_background: true,
            prefer_css_page_size: true,
            landscape: false,
        }
    }

    /// A4 with fixed 20mm top/bottom and 15mm left/right margins.
    pub fn fixed_margins() -> Self {
        Self {
            paper_width_mm: A4_WIDTH_MM,
            paper_height_mm: A4_HEIGHT_MM,
            margins: Margins {
                top: 20.0,
                bottom: 20.0,
                left: 15.0,
                right: 15.0,
            },
            print_background: true,
            prefer_css_page_size: false,
            landscape: false,
        }
    }

    /// Converts a millimetre value to inches, the unit the DevTools print API uses.
    pub fn mm_to_inches(mm: f64) -> f64 {
        mm / MM_PER_INCH
    }
}

/// How long and how often to wait for a document to settle.
///
/// A document is settled once `document.readyState` is `complete` and no
/// network request has been in flight for `network_idle`. Both must happen
/// within `timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub network_idle: Duration,
}

impl WaitPolicy {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(READY_POLL_INTERVAL_MS),
            network_idle: Duration::from_millis(DEFAULT_NETWORK_IDLE_MS),
        }
    }
}

/// What to load into a render context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Markup injected directly into the context.
    Markup(String),
    /// A document fetched by network navigation.
    Url(String),
}

impl DocumentSource {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Markup(_) => "markup",
            Self::Url(_) => "url",
        }
    }
}
