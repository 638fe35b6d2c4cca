//! HTTP server command: `casedesk serve`.

use anyhow::Result;
use std::path::PathBuf;

use casedesk::config::AppConfig;
use casedesk::web::{ServerConfig, start_server};

pub async fn cmd_serve(
    config: &AppConfig,
    port: Option<u16>,
    db_path: Option<PathBuf>,
    dev: bool,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(path) = db_path {
        config.database.path = path;
    }
    config.server.dev |= dev;

    start_server(ServerConfig::from_app_config(&config)).await
}
