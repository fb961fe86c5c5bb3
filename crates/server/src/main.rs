//! beekon-worker entry point.
//!
//! Boots the cache router and storage manager, then serves them as MCP tools
//! on stdio. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use beekon_core::storage::{MemoryBackend, SqliteBackend, StorageBackend};
use beekon_core::{AppConfig, CacheDb, StorageManager, SystemClock};
use beekon_worker::{ApiSweeper, CacheRouter, FetchConfig, HttpFetcher, RouterConfig};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

use handler::{AppState, BeekonServer};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, version = %config.cache_version, "Starting beekon-worker on stdio transport");

    let cache = CacheDb::open(&config.db_path).await?;
    let fetcher = HttpFetcher::new(&FetchConfig::from(&config))?;
    let router = Arc::new(CacheRouter::new(
        RouterConfig::from_app_config(&config)?,
        cache,
        Arc::new(fetcher),
        Arc::new(SystemClock),
    ));

    match router.install().await {
        Ok(()) => match router.activate().await {
            Ok(deleted) => tracing::info!(deleted = deleted.len(), "worker activated"),
            Err(err) => tracing::warn!(error = %err, "activation failed"),
        },
        Err(err) => tracing::warn!(error = %err, "install failed, serving without precache"),
    }

    let sweeper = ApiSweeper::spawn(router.clone(), config.sweep_interval());
    let storage = StorageManager::new(durable_backend(&config), Box::new(MemoryBackend::new()), Arc::new(SystemClock));

    let handler = BeekonServer::new(Arc::new(AppState { router, storage }));
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    sweeper.abort();

    Ok(())
}

/// Durable storage on disk, or a disabled backend if the file can't be opened.
fn durable_backend(config: &AppConfig) -> Box<dyn StorageBackend> {
    match SqliteBackend::open(&config.storage_path) {
        Ok(backend) => Box::new(backend),
        Err(err) => {
            tracing::warn!(path = %config.storage_path.display(), error = %err, "durable storage unavailable");
            Box::new(MemoryBackend::disabled())
        }
    }
}
