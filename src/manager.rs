//! Shared render session manager.
//!
//! This module provides [`SessionManager`], which owns the single engine
//! connection every render runs on. Launching a browser costs seconds;
//! opening a tab on a running one costs milliseconds, so the manager keeps
//! one session alive and hands it to every request.
//!
//! # Architecture
//!
//! ```text
//! SessionManager
//!   ├─ engine: Arc<dyn RenderEngine>                   (launches sessions)
//!   ├─ current: tokio::Mutex<Option<Arc<RenderSession>>>  (the shared slot)
//!   ├─ shutting_down: AtomicBool
//!   └─ launches: AtomicU64
//! ```
//!
//! # Acquisition
//!
//! ```text
//! acquire()
//!   │
//!   ├─ clone current session out of the slot (lock held briefly)
//!   ├─ ping it on the blocking pool (lock NOT held)
//!   │     ├─ healthy ──────────────────────────────▶ return it
//!   │     └─ dead
//!   ▼
//! relaunch(stale_id)
//!   ├─ lock slot (held across the launch)
//!   ├─ slot holds a different, live session? ─────▶ return it
//!   ├─ close stale session (background)
//!   └─ launch on the blocking pool, store, return
//! ```
//!
//! # Critical Invariants
//!
//! 1. **One launch in flight**: the slot lock is held for the whole launch;
//!    waiters re-check by session id and reuse what the launch produced.
//! 2. **No half-initialized session**: the slot is only written after a
//!    successful launch.
//! 3. **Shutdown flag**: checked before every launch; once set, acquisitions
//!    fail with [`EngineError::ShuttingDown`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::engine::RenderEngine;
use crate::error::{EngineError, Result};
use crate::session::RenderSession;
use crate::stats::SessionStats;
use crate::traits::Healthcheck;

/// Default upper bound for [`SessionManager::warmup`].
pub const DEFAULT_WARMUP_TIMEOUT_SECS: u64 = 60;

/// Owner of the process-wide render session.
///
/// Construct once at startup and share it as `Arc<SessionManager>`.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use html2pdf_gateway::{ChromeEngine, SessionManager};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let sessions = Arc::new(
///         SessionManager::builder()
///             .engine(Box::new(ChromeEngine::with_defaults()))
///             .build()?,
///     );
///
///     sessions.warmup().await?;
///
///     let session = sessions.acquire().await?;
///     println!("Rendering on session {}", session.id());
///
///     sessions.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct SessionManager {
    engine: Arc<dyn RenderEngine>,
    current: Mutex<Option<Arc<RenderSession>>>,
    shutting_down: AtomicBool,
    launches: AtomicU64,
    warmup_timeout: Duration,
}

impl SessionManager {
    /// Create a new builder.
    pub fn builder() -> SessionManagerBuilder {
        SessionManagerBuilder::new()
    }

    /// Return the shared session, launching or relaunching it if needed.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ShuttingDown`] after [`shutdown`](Self::shutdown)
    /// - [`EngineError::Launch`] if a new session cannot be started
    pub async fn acquire(&self) -> Result<Arc<RenderSession>> {
        if self.is_shutting_down() {
            return Err(EngineError::ShuttingDown);
        }

        let existing = self.current.lock().await.clone();

        let stale_id = match existing {
            Some(session) => {
                let probe = Arc::clone(&session);
                match tokio::task::spawn_blocking(move || probe.ping()).await {
                    Ok(Ok(())) => {
                        log::trace!("Reusing render session {}", session.id());
                        return Ok(session);
                    }
                    Ok(Err(e)) => {
                        log::warn!("⚠️ Render session {} unhealthy: {}", session.id(), e);
                    }
                    Err(e) => {
                        log::error!("❌ Health check task for session {} failed: {}", session.id(), e);
                        session.mark_dead();
                    }
                }
                Some(session.id())
            }
            None => None,
        };

        self.relaunch(stale_id).await
    }

    /// Replace the session identified by `stale_id` (or fill an empty slot).
    async fn relaunch(&self, stale_id: Option<u64>) -> Result<Arc<RenderSession>> {
        let mut slot = self.current.lock().await;

        if self.is_shutting_down() {
            log::debug!("Skipping launch - session manager is shutting down");
            return Err(EngineError::ShuttingDown);
        }

        // Another task may have launched while we waited for the lock.
        if let Some(current) = slot.as_ref() {
            if Some(current.id()) != stale_id && current.is_marked_alive() {
                log::debug!(
                    "Render session {} was launched concurrently, reusing",
                    current.id()
                );
                return Ok(Arc::clone(current));
            }
        }

        if let Some(stale) = slot.take() {
            log::info!("♻️ Replacing render session {}", stale.id());
            tokio::task::spawn_blocking(move || stale.close());
        }

        log::info!("Launching render session ({} engine)...", self.engine.name());

        let engine = Arc::clone(&self.engine);
        let connection = tokio::task::spawn_blocking(move || engine.launch())
            .await
            .map_err(|e| EngineError::Launch(format!("launch task failed: {}", e)))?
            .map_err(|e| {
                log::error!("❌ Failed to launch render session: {}", e);
                e
            })?;

        let session = Arc::new(RenderSession::new(connection));
        self.launches.fetch_add(1, Ordering::SeqCst);
        *slot = Some(Arc::clone(&session));

        log::info!("✅ Render session {} ready", session.id());
        Ok(session)
    }

    /// Launch the session eagerly, so the first request doesn't pay for it.
    ///
    /// # Errors
    ///
    /// Returns the launch error, or [`EngineError::Launch`] if the launch
    /// does not finish within the warmup timeout.
    pub async fn warmup(&self) -> Result<()> {
        log::info!(
            "Warming up render session (timeout: {}s)",
            self.warmup_timeout.as_secs()
        );

        match tokio::time::timeout(self.warmup_timeout, self.acquire()).await {
            Ok(Ok(session)) => {
                log::info!("✅ Warmup completed - session {} is live", session.id());
                Ok(())
            }
            Ok(Err(e)) => {
                log::error!("❌ Warmup failed with error: {}", e);
                Err(e)
            }
            Err(_) => {
                log::error!("❌ Warmup timed out after {}s", self.warmup_timeout.as_secs());
                Err(EngineError::Launch(format!(
                    "warmup timed out after {}s",
                    self.warmup_timeout.as_secs()
                )))
            }
        }
    }

    /// Snapshot of the current state.
    pub async fn stats(&self) -> SessionStats {
        let slot = self.current.lock().await;
        let session = slot.as_ref();

        SessionStats {
            live: session.is_some_and(|s| s.is_marked_alive()),
            session_id: session.map(|s| s.id()),
            session_age_secs: session.map(|s| s.age().as_secs()),
            launches: self.launches.load(Ordering::SeqCst),
            shutting_down: self.is_shutting_down(),
        }
    }

    /// Stop handing out sessions and close the current one. Idempotent.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            log::debug!("Session manager already shut down");
            return;
        }

        log::info!("Shutting down render session manager...");

        let session = self.current.lock().await.take();
        match session {
            Some(session) => {
                if let Err(e) = tokio::task::spawn_blocking(move || session.close()).await {
                    log::error!("❌ Closing render session panicked: {}", e);
                }
            }
            None => log::debug!("No render session to close"),
        }

        log::info!(
            "Shutdown complete - {} session(s) launched over process lifetime",
            self.launches.load(Ordering::SeqCst)
        );
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Name of the underlying engine.
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            log::debug!("Session manager already shut down, Drop is no-op");
            return;
        }

        log::warn!("⚠️ SessionManager dropped without explicit shutdown - cleaning up");
        if let Some(session) = self.current.get_mut().take() {
            session.close();
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("engine", &self.engine.name())
            .field("launches", &self.launches.load(Ordering::SeqCst))
            .field("shutting_down", &self.is_shutting_down())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SessionManagerBuilder
// ============================================================================

/// Builder for [`SessionManager`].
///
/// ```rust,ignore
/// let sessions = SessionManager::builder()
///     .engine(Box::new(ChromeEngine::with_defaults()))
///     .warmup_timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub struct SessionManagerBuilder {
    /// Required.
    engine: Option<Box<dyn RenderEngine>>,
    warmup_timeout: Duration,
}

impl SessionManagerBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            warmup_timeout: Duration::from_secs(DEFAULT_WARMUP_TIMEOUT_SECS),
        }
    }

    /// Set the engine sessions are launched from (required).
    pub fn engine(mut self, engine: Box<dyn RenderEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Upper bound for [`SessionManager::warmup`].
    pub fn warmup_timeout(mut self, timeout: Duration) -> Self {
        self.warmup_timeout = timeout;
        self
    }

    /// Build the manager. No session is launched until the first
    /// [`acquire`](SessionManager::acquire) or [`warmup`](SessionManager::warmup).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if no engine was provided or the
    /// warmup timeout is zero.
    pub fn build(self) -> Result<SessionManager> {
        let engine = self
            .engine
            .ok_or_else(|| EngineError::Configuration("No render engine provided".to_string()))?;

        if self.warmup_timeout.is_zero() {
            return Err("warmup_timeout must be greater than 0".into());
        }

        log::info!("Building session manager with {} engine", engine.name());

        Ok(SessionManager {
            engine: Arc::from(engine),
            current: Mutex::new(None),
            shutting_down: AtomicBool::new(false),
            launches: AtomicU64::new(0),
            warmup_timeout: self.warmup_timeout,
        })
    }
}

impl Default for SessionManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockEngine;

    fn manager(engine: MockEngine) -> SessionManager {
        SessionManager::builder()
            .engine(Box::new(engine))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_missing_engine() {
        let result = SessionManager::builder().build();

        match result {
            Err(EngineError::Configuration(msg)) => {
                assert!(msg.contains("No render engine provided"));
            }
            _ => panic!("Expected Configuration error for missing engine"),
        }
    }

    #[test]
    fn test_builder_rejects_zero_warmup_timeout() {
        let result = SessionManager::builder()
            .engine(Box::new(MockEngine::new()))
            .warmup_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_lazy_launch() {
        let engine = MockEngine::new();
        let state = engine.state();
        let sessions = manager(engine);

        assert_eq!(state.launches(), 0);
        assert!(!sessions.stats().await.live);

        sessions.acquire().await.unwrap();
        assert_eq!(state.launches(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_stores_nothing() {
        let sessions = manager(MockEngine::always_fails("no chrome"));

        let result = sessions.acquire().await;
        assert!(matches!(result, Err(EngineError::Launch(_))));

        let stats = sessions.stats().await;
        assert!(stats.session_id.is_none());
        assert_eq!(stats.launches, 0);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let engine = MockEngine::new();
        let sessions = manager(engine);
        sessions.acquire().await.unwrap();

        sessions.shutdown().await;
        sessions.shutdown().await;

        assert!(sessions.is_shutting_down());
        assert!(matches!(
            sessions.acquire().await,
            Err(EngineError::ShuttingDown)
        ));
        assert!(sessions.stats().await.session_id.is_none());
    }

    #[tokio::test]
    async fn test_warmup_launches_once() {
        let engine = MockEngine::new();
        let state = engine.state();
        let sessions = manager(engine);

        sessions.warmup().await.unwrap();
        sessions.acquire().await.unwrap();

        assert_eq!(state.launches(), 1);
        assert!(sessions.stats().await.is_ready());
    }

    #[tokio::test]
    async fn test_drop_closes_session() {
        let engine = MockEngine::new();
        let sessions = manager(engine);
        let session = sessions.acquire().await.unwrap();

        drop(sessions);
        assert!(!session.is_marked_alive());
    }
}
