//! Concurrent access tests for the shared render session.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{local_harness, mock_sessions};
use html2pdf_gateway::engine::mock::MockEngine;
use html2pdf_gateway::prelude::*;
use tokio::task::JoinSet;

/// Sequential acquisitions reuse one session.
#[tokio::test]
async fn test_session_is_reused() {
    let engine = MockEngine::new();
    let state = engine.state();
    let sessions = mock_sessions(engine);

    let first = sessions.acquire().await.unwrap();
    let second = sessions.acquire().await.unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(state.launches(), 1);
}

/// A dead session is replaced on the next acquisition.
#[tokio::test]
async fn test_relaunch_after_session_death() {
    let engine = MockEngine::new();
    let state = engine.state();
    let sessions = mock_sessions(engine);

    let first = sessions.acquire().await.unwrap();
    state.kill_sessions();

    let second = sessions.acquire().await.unwrap();
    assert_ne!(first.id(), second.id());
    assert!(!first.is_marked_alive());
    assert_eq!(state.launches(), 2);

    let stats = sessions.stats().await;
    assert_eq!(stats.relaunches(), 1);
    assert_eq!(stats.session_id, Some(second.id()));
}

/// Concurrent first acquisitions launch exactly once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_acquire_launches_once() {
    let engine = MockEngine::new().with_launch_delay(Duration::from_millis(100));
    let state = engine.state();
    let sessions = mock_sessions(engine);

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let sessions = Arc::clone(&sessions);
        tasks.spawn(async move { sessions.acquire().await.map(|s| s.id()) });
    }

    let mut ids = Vec::new();
    while let Some(result) = tasks.join_next().await {
        ids.push(result.unwrap().unwrap());
    }

    assert_eq!(state.launches(), 1);
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
}

/// Concurrent acquisitions after a crash relaunch exactly once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_recovery_launches_once() {
    let engine = MockEngine::new().with_launch_delay(Duration::from_millis(50));
    let state = engine.state();
    let sessions = mock_sessions(engine);

    sessions.acquire().await.unwrap();
    state.kill_sessions();

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let sessions = Arc::clone(&sessions);
        tasks.spawn(async move { sessions.acquire().await.map(|s| s.id()) });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(state.launches(), 2);
}

/// Many concurrent conversions share one session and each closes its context.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_conversions_isolated() {
    let h = local_harness().await;
    let service = Arc::new(h.service.clone());

    let mut tasks = JoinSet::new();
    for i in 0..20 {
        let service = Arc::clone(&service);
        tasks.spawn(async move {
            let html = format!("<p>doc {}</p>", i);
            let request = RenderRequest::from_inputs(None, Some(html.clone()), None)?;
            let outcome = service.create_pdf(request, "http://localhost").await?;
            let pdf = service.download_pdf(&outcome.filename).await?;
            Ok::<_, ServiceError>((html, pdf))
        });
    }

    while let Some(result) = tasks.join_next().await {
        let (html, pdf) = result.unwrap().unwrap();
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains(&html), "each download carries its own document");
    }

    assert_eq!(h.engine.launches(), 1);
    assert_eq!(h.engine.contexts_opened(), 20);
    assert_eq!(h.engine.contexts_closed(), 20);
}

/// Stats stay readable while shutdown races acquisitions.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_during_acquire() {
    let engine = MockEngine::new().with_launch_delay(Duration::from_millis(20));
    let sessions = mock_sessions(engine);

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let sessions = Arc::clone(&sessions);
        tasks.spawn(async move {
            let _ = sessions.acquire().await;
            sessions.stats().await
        });
    }

    sessions.shutdown().await;
    sessions.shutdown().await;

    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    let stats = sessions.stats().await;
    assert!(stats.shutting_down);
    assert!(!stats.is_ready());
    assert!(sessions.acquire().await.is_err());
}
