//! Runtime configuration for the server and client binaries, via `clap`
//! derive with environment-variable fallbacks.

use std::path::PathBuf;

use clap::{Args, Parser};
use uuid::Uuid;

#[derive(Debug, Parser)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to.
    #[arg(long, env = "FILESYNC_LISTEN_ADDR", default_value = "0.0.0.0:50051")]
    pub listen_addr: String,

    /// Path to the sqlite metadata catalog.
    #[arg(long, env = "FILESYNC_DB_PATH", default_value = "filesync.db")]
    pub db_path: PathBuf,

    /// Root directory under which `primary/` and `backup/` storage live.
    #[arg(long, env = "FILESYNC_STORAGE_ROOT", default_value = "storage")]
    pub storage_root: PathBuf,
}

#[derive(Debug, Args)]
pub struct ClientConfig {
    /// Base URL of the server, e.g. `http://127.0.0.1:50051`.
    #[arg(long, env = "FILESYNC_SERVER_URL", default_value = "http://127.0.0.1:50051")]
    pub server_url: String,

    /// Local directory kept in sync with the server.
    #[arg(long, env = "FILESYNC_SYNC_DIR", default_value = ".")]
    pub sync_dir: PathBuf,
}

const SITE_ID_FILE: &str = ".filesync_site_id";

/// Loads this client's persisted site id from `<sync_dir>/.filesync_site_id`,
/// generating and caching a new random one on first run.
pub fn load_or_create_site_id(sync_dir: &std::path::Path) -> std::io::Result<String> {
    let path = sync_dir.join(SITE_ID_FILE);
    if let Ok(existing) = std::fs::read_to_string(&path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    let id = Uuid::new_v4().to_string();
    std::fs::write(&path, &id)?;
    Ok(id)
}
