//! shelf-cache server entry point.
//!
//! Boots the offline cache controller and serves it over the MCP stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shelf_client::{FetchClient, FetchConfig};
use shelf_core::{AppConfig, CacheDb, CacheStorage, Network, OfflineController};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        origin = %config.origin,
        precache = %config.precache_name,
        runtime = %config.runtime_name,
        db = %config.db_path.display(),
        "Starting shelf-cache server on stdio transport"
    );

    let storage: Arc<dyn CacheStorage> = Arc::new(CacheDb::open(&config.db_path).await?);
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config), config.origin_url()?)?);
    let controller = Arc::new(OfflineController::new(&config, storage, Arc::clone(&network))?);

    match controller.start().await {
        Ok(evicted) => tracing::info!(evicted = evicted.len(), "controller active"),
        Err(e) => tracing::error!(error = %e, state = %controller.state(), "controller did not start; requests pass through"),
    }

    let handler = handler::ShelfServer::new(Arc::clone(&controller), network);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    controller.settle().await;

    Ok(())
}
