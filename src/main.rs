//! `html2pdf-gateway` server binary.

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use html2pdf_gateway::config::env::from_env;
use html2pdf_gateway::integrations::axum::{AppState, router, shutdown_signal};
use html2pdf_gateway::layout::WaitPolicy;
use html2pdf_gateway::logging;
use html2pdf_gateway::service::{ConversionService, DocumentRenderer};
use html2pdf_gateway::storage::ArtifactStore;
use html2pdf_gateway::{ChromeEngine, SessionManager};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(config.environment);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("❌ Server terminated: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: html2pdf_gateway::ServerConfig) -> Result<(), Box<dyn Error>> {
    log::info!("🚀 Starting html2pdf-gateway...");
    config.log_summary();

    let store = ArtifactStore::from_config(&config.storage)?;
    store.init().await?;
    log::info!("✅ Storage provider ready: {}", store.provider_name());

    let sessions = Arc::new(
        SessionManager::builder()
            .engine(Box::new(ChromeEngine::from_path(config.chrome_path.clone())))
            .build()?,
    );

    // No point listening without a working browser.
    if let Err(e) = sessions.warmup().await {
        log::error!("❌ Browser warmup failed: {}", e);
        sessions.shutdown().await;
        return Err(e.into());
    }
    log::info!("✅ Render engine ready: {}", sessions.engine_name());

    let renderer = DocumentRenderer::new(
        Arc::clone(&sessions),
        WaitPolicy::with_timeout(config.render_timeout),
    );
    let service = ConversionService::new(renderer, store).keep_uploads(config.keep_uploads);

    let app = router(
        AppState::new(service, Arc::clone(&sessions)),
        config.body_limit,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    log::info!("✅ Listening on http://{}", config.bind_address());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sessions.shutdown().await;
    log::info!("👋 Server stopped");

    served.map_err(Into::into)
}
