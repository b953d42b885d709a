//! Shared fixtures for integration tests: a mock-backed session manager,
//! throwaway artifact stores, and a ready-to-use conversion service.

#![allow(dead_code)]

use std::sync::Arc;

use html2pdf_gateway::engine::mock::{MockEngine, MockState};
use html2pdf_gateway::prelude::*;
use html2pdf_gateway::storage::ObjectStoreProvider;
use tempfile::TempDir;

/// Everything a test needs to drive a conversion and inspect the result.
pub struct Harness {
    pub service: ConversionService,
    pub sessions: Arc<SessionManager>,
    pub engine: Arc<MockState>,
    pub store: ArtifactStore,
    // Held so the directory outlives the test.
    pub dir: Option<TempDir>,
}

/// Session manager over a fresh mock engine.
pub fn mock_sessions(engine: MockEngine) -> Arc<SessionManager> {
    Arc::new(
        SessionManager::builder()
            .engine(Box::new(engine))
            .build()
            .expect("mock session manager"),
    )
}

/// Store rooted in a new temporary directory.
pub async fn local_store() -> (ArtifactStore, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = ArtifactStore::new(Arc::new(LocalStorageProvider::new(dir.path())));
    store.init().await.expect("init local store");
    (store, dir)
}

pub fn memory_store() -> ArtifactStore {
    ArtifactStore::new(Arc::new(ObjectStoreProvider::in_memory()))
}

fn harness(engine: MockEngine, store: ArtifactStore, dir: Option<TempDir>) -> Harness {
    let state = engine.state();
    let sessions = mock_sessions(engine);
    let service = ConversionService::new(
        DocumentRenderer::new(Arc::clone(&sessions), WaitPolicy::default()),
        store.clone(),
    );

    Harness {
        service,
        sessions,
        engine: state,
        store,
        dir,
    }
}

/// Mock engine plus local storage in a temp directory.
pub async fn local_harness() -> Harness {
    let (store, dir) = local_store().await;
    harness(MockEngine::new(), store, Some(dir))
}

/// Mock engine plus in-memory object storage.
pub fn memory_harness() -> Harness {
    harness(MockEngine::new(), memory_store(), None)
}

/// Local-storage harness over a caller-configured engine.
pub async fn local_harness_with(engine: MockEngine) -> Harness {
    let (store, dir) = local_store().await;
    harness(engine, store, Some(dir))
}

/// Local storage rooted at a regular file, so every write fails.
pub fn unwritable_harness() -> Harness {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = dir.path().join("not-a-directory");
    std::fs::write(&root, b"").expect("placeholder file");
    let store = ArtifactStore::new(Arc::new(LocalStorageProvider::new(root)));
    harness(MockEngine::new(), store, Some(dir))
}
