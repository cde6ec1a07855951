//! Document Q&A server binary
//!
//! Run with: cargo run --bin docuchat-server [config.toml]

use std::path::PathBuf;

use docuchat::config::AppConfig;
use docuchat::server::AppServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docuchat=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    tracing::info!("configuration loaded");
    tracing::info!("  - chunk size: {}", config.chunking.chunk_size);
    tracing::info!("  - chunk overlap: {}", config.chunking.chunk_overlap);
    tracing::info!("  - match count: {}", config.retrieval.match_count);
    tracing::info!("  - match threshold: {}", config.retrieval.match_threshold);
    tracing::info!("  - workers: {}", config.queue.workers);

    let server = AppServer::new(config).await?;

    println!("docuchat server starting on http://{}", server.address());
    println!("Endpoints:");
    println!("  POST  /api/documents/upload - upload a document");
    println!("  GET   /api/documents        - list documents");
    println!("  PATCH /api/documents        - rename or retry a document");
    println!("  POST  /api/ask              - ask a question");
    println!("  GET   /api/queue-status     - queue statistics");

    server.start().await?;
    Ok(())
}
