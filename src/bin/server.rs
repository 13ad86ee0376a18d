//! Sync server entry point: wires up the catalog, transfer engine, and CRDT
//! manager behind the Axum router and starts listening.

use clap::Parser;
use rga_filesync::catalog::Catalog;
use rga_filesync::config::ServerConfig;
use rga_filesync::server::{AppState, create_router};
use rga_filesync::transfer::TransferEngine;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::parse();

    let catalog = Catalog::open(&config.db_path)?;
    let transfer = TransferEngine::new(config.storage_root.clone());
    let state = AppState::new("server", catalog, transfer);

    let router = create_router(state);

    info!("listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
