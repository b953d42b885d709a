//! The shared render session.
//!
//! A [`RenderSession`] wraps one live [`EngineConnection`] (one browser
//! process) with the metadata the [`SessionManager`](crate::SessionManager)
//! needs to decide whether it can be reused:
//!
//! ```text
//! RenderSession
//! ├── id: u64              (unique, for log correlation)
//! ├── connection           (Box<dyn EngineConnection>)
//! ├── alive: AtomicBool    (cleared on failure, never set again)
//! └── created_at: Instant  (age reporting)
//! ```
//!
//! Sessions are shared as `Arc<RenderSession>`. A dead session is never
//! revived; the manager replaces it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::engine::EngineConnection;
use crate::error::{EngineError, Result};
use crate::traits::Healthcheck;

/// One launched engine connection plus liveness tracking.
pub struct RenderSession {
    id: u64,
    connection: Box<dyn EngineConnection>,
    alive: AtomicBool,
    created_at: Instant,
}

impl RenderSession {
    /// Wrap a freshly launched connection.
    pub(crate) fn new(connection: Box<dyn EngineConnection>) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
            connection,
            alive: AtomicBool::new(true),
            created_at: Instant::now(),
        }
    }

    /// Unique identifier, assigned sequentially.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Time since launch.
    #[inline]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Whether the session has not been marked dead.
    ///
    /// This only reads the flag; [`ping`](Healthcheck::ping) also asks the
    /// engine.
    #[inline]
    pub fn is_marked_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Flag the session as unusable. The next acquisition relaunches.
    pub fn mark_dead(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            log::warn!("⚠️ Render session {} marked dead", self.id);
        }
    }

    pub(crate) fn connection(&self) -> &dyn EngineConnection {
        self.connection.as_ref()
    }

    /// Mark dead and terminate the engine process.
    pub(crate) fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.connection.close();
        log::info!(
            "Render session {} closed after {}s",
            self.id,
            self.age().as_secs()
        );
    }
}

impl Healthcheck for RenderSession {
    /// Checks the liveness flag first, then probes the engine.
    ///
    /// A failed probe also clears the flag so later callers skip the probe.
    fn ping(&self) -> Result<()> {
        log::trace!("Pinging render session {}...", self.id);

        if !self.is_marked_alive() {
            return Err(EngineError::HealthCheckFailed(format!(
                "session {} already marked dead",
                self.id
            )));
        }

        if !self.connection.is_alive() {
            self.mark_dead();
            return Err(EngineError::HealthCheckFailed(format!(
                "session {} engine is not responding",
                self.id
            )));
        }

        log::trace!("✅ Render session {} ping successful", self.id);
        Ok(())
    }
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("id", &self.id)
            .field("alive", &self.is_marked_alive())
            .field("age_secs", &self.age().as_secs())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
