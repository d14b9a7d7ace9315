//! missal-mcp server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use missal_client::{ContentService, FetchClient, FetchConfig, validate_sources};
use missal_core::config::{AppConfig, StoreBackend};
use missal_core::{CacheDb, CacheStore, JsonFileStore, MemoryStore, SystemClock};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

async fn open_store(config: &AppConfig) -> Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.store {
        StoreBackend::Sqlite => Arc::new(CacheDb::open(&config.db_path).await?),
        StoreBackend::Json => Arc::new(JsonFileStore::open(&config.json_path).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    validate_sources(&config.sources)?;

    let store = open_store(&config).await?;
    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let service = ContentService::new(config.sources.clone(), store, Arc::new(fetcher), Arc::new(SystemClock));

    tracing::info!(store = ?config.store, keys = config.sources.len(), "Starting missal-mcp server on stdio transport");

    let handler = handler::MissalServer::new(service);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
