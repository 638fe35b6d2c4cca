//! Configuration view and validation commands: `casedesk config`.

use anyhow::Result;
use std::path::Path;

use casedesk::config::AppConfig;

use super::super::ConfigCommands;

/// `effective` is the loaded config with environment overrides applied.
pub fn cmd_config(
    config_path: &Path,
    effective: &AppConfig,
    command: Option<ConfigCommands>,
) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("casedesk configuration");
            println!("======================");
            println!();
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No casedesk.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            println!("[server]");
            println!("  host = \"{}\"", effective.server.host);
            println!("  port = {}", effective.server.port);
            println!("  dev = {}", effective.server.dev);
            println!();
            println!("[database]");
            println!("  path = \"{}\"", effective.database.path.display());
            println!();
            println!("[storage]");
            println!("  root = \"{}\"", effective.storage_root().display());
            println!("  public_base_url = \"{}\"", effective.public_base_url());
            println!();
            println!("[logging]");
            println!("  level = \"{}\"", effective.logging.level);
            println!("  json = {}", effective.logging.json);
            if let Some(dir) = &effective.logging.directory {
                println!("  directory = \"{}\"", dir.display());
            }
            println!();
            println!("[sync]");
            println!("  channel_capacity = {}", effective.sync.channel_capacity);
            println!();

            if !config_path.exists() {
                println!("Run 'casedesk config init' to create a casedesk.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No casedesk.toml found. Using defaults (valid).");
                return Ok(());
            }

            let warnings = AppConfig::load(config_path)?.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("casedesk.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            AppConfig::default().save(config_path)?;

            println!("Created casedesk.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] host, port, dev");
            println!("  - [database] path");
            println!("  - [storage] root, public_base_url");
            println!("  - [logging] level, json, directory");
            println!();
        }
    }

    Ok(())
}
