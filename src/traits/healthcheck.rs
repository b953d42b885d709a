//! Health check trait for render sessions.
//!
//! The [`SessionManager`](crate::SessionManager) pings the shared session
//! on every acquisition. A failed ping means the session is replaced by a
//! freshly launched one.

use crate::error::Result;

/// Trait for engine-backed objects that can verify they are still usable.
///
/// # Thread Safety
///
/// Requires `Send + Sync`: the manager pings from the blocking pool while
/// other tasks hold references to the same session.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use html2pdf_gateway::{EngineError, Healthcheck, Result};
///
/// struct MySession {
///     connected: bool,
/// }
///
/// impl Healthcheck for MySession {
///     fn ping(&self) -> Result<()> {
///         if self.connected {
///             Ok(())
///         } else {
///             Err(EngineError::HealthCheckFailed("disconnected".into()))
///         }
///     }
/// }
/// ```
pub trait Healthcheck: Send + Sync {
    /// Perform a cheap liveness probe.
    ///
    /// # Implementation Guidelines
    ///
    /// - **Keep it fast**: it runs before every render
    /// - **Don't hold locks**: the manager calls it outside its session lock
    /// - **Never panic** on a dead engine; report an error instead
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::HealthCheckFailed`](crate::EngineError::HealthCheckFailed)
    /// when the engine is unresponsive or gone.
    fn ping(&self) -> Result<()>;
}
