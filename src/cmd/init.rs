//! Database initialization command: `casedesk init`.

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use casedesk::config::AppConfig;
use casedesk::web::ServerConfig;
use casedesk::web::server::open_backend;

pub fn cmd_init(config: &AppConfig, db_path: Option<PathBuf>) -> Result<()> {
    let mut config = config.clone();
    if let Some(path) = db_path {
        config.database.path = path;
    }
    let server = ServerConfig::from_app_config(&config);
    open_backend(&server)?;

    info!(db = %server.db_path.display(), "Database initialized");
    println!("Database initialized at {}", server.db_path.display());
    println!("Object storage at {}", server.storage_root.display());
    Ok(())
}
