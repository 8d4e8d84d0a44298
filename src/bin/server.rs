//! Larder Sync Server
//!
//! Stores record collections and reconciles client pushes with
//! last-write-wins.
//!
//! # Configuration
//!
//! See [`larder::config`]: `LARDER_PORT`, `LARDER_DATA_DIR`, `LARDER_CONFIG`.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint
//! - `POST /sync`: Push local records, receive changes since a checkpoint
//! - `POST /data`: Receive changes since a checkpoint

use std::net::SocketAddr;
use std::sync::Arc;

use larder::{router, ServerConfig, SyncService};
use larder_core::{FileStore, SystemClock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "larder_server=info,larder=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load()?;

    std::fs::create_dir_all(&config.data_dir)?;

    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Config file: {}", config.config_path.display());
    if config.collections.is_empty() {
        tracing::info!("Accepting any collection name");
    } else {
        tracing::info!("Accepting collections: {}", config.collections.join(", "));
    }

    let service = SyncService::new(FileStore::new(&config.data_dir), SystemClock)
        .with_allowed_collections(config.collections.clone());
    let app = router(Arc::new(service));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
