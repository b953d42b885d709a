//! Session statistics for monitoring and health checks.
//!
//! [`SessionStats`] is a point-in-time snapshot of the
//! [`SessionManager`](crate::SessionManager). The `/health` route embeds it
//! in its response.

use serde::Serialize;

/// Snapshot of the session manager's state.
///
/// | Field | Description |
/// |-------|-------------|
/// | `live` | A session exists and has not been marked dead |
/// | `session_id` | Id of the current session, if any |
/// | `session_age_secs` | Seconds since the current session was launched |
/// | `launches` | Successful launches since startup |
/// | `shutting_down` | [`shutdown`](crate::SessionManager::shutdown) was called |
///
/// ```rust
/// use html2pdf_gateway::SessionStats;
///
/// let stats = SessionStats {
///     live: true,
///     session_id: Some(1),
///     session_age_secs: Some(42),
///     launches: 1,
///     shutting_down: false,
/// };
///
/// assert_eq!(stats.relaunches(), 0);
/// assert!(stats.is_ready());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub live: bool,
    pub session_id: Option<u64>,
    pub session_age_secs: Option<u64>,
    pub launches: u64,
    pub shutting_down: bool,
}

impl SessionStats {
    /// Launches beyond the first one, i.e. recoveries from a dead session.
    #[inline]
    pub fn relaunches(&self) -> u64 {
        self.launches.saturating_sub(1)
    }

    /// Whether a render could start without launching first.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.live && !self.shutting_down
    }
}
