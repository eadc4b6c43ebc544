mod analysis;
mod config;
mod storage;
mod web;
mod youtube;

use std::sync::Arc;
use anyhow::Result;
use tracing::info;

use config::StorageBackend;
use storage::DedupStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stance=info,tower_http=info".into()),
        )
        .init();

    info!("Loading configuration...");
    let config = config::AppConfig::load()?;

    // Process-scoped resources, built once and shared by every request
    let source = Arc::new(youtube::YouTubeClient::new(&config.youtube));
    let classifier = Arc::new(analysis::GeminiClassifier::new(&config.gemini));
    let store: Arc<dyn DedupStore> = match config.storage.backend {
        StorageBackend::Jsonl => Arc::new(storage::JsonlStore::open(&config.storage.data_dir).await?),
        StorageBackend::Memory => {
            info!("Using in-memory dedup store; results are lost on restart");
            Arc::new(storage::MemoryStore::new())
        }
    };

    info!(
        "Classifier strategy: {:?} (batch size {}, {}ms between batches, {} attempts)",
        config.scheduler.strategy,
        config.scheduler.batch_size,
        config.scheduler.batch_delay_ms,
        config.scheduler.max_attempts,
    );
    let scheduler = analysis::BatchScheduler::new(classifier, config.scheduler.clone());
    let analyzer = Arc::new(analysis::Analyzer::new(
        source,
        store,
        scheduler,
        config.youtube.max_results,
    ));

    // Web server
    let router = web::create_router(web::state::AppState::new(analyzer));
    let addr = format!("{}:{}", config.web.host, config.web.port);
    info!("Starting web server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:#}", e);
        std::future::pending::<()>().await;
    }
}
