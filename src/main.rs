use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use casedesk::config::{AppConfig, default_config_path};

mod cmd;

#[derive(Parser)]
#[command(name = "casedesk")]
#[command(version, about = "Law-firm back office for loan case applications")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to casedesk.toml (defaults to .casedesk/casedesk.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP and WebSocket server
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Enable dev mode (permissive CORS for a separately served front end)
        #[arg(long)]
        dev: bool,
    },
    /// Create the database and storage directories
    Init {
        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Import case applications from a JSON file
    Import {
        /// JSON array of case objects
        file: PathBuf,

        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate casedesk.toml
    Validate,
    /// Write a default casedesk.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => default_config_path(
            &std::env::current_dir().context("Failed to get current directory")?,
        ),
    };

    let mut config = AppConfig::load_or_default(&config_path)?;
    config.apply_env()?;

    let _log_guard = casedesk::logging::init(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Serve { port, db_path, dev } => {
            for warning in config.validate() {
                warn!("{}", warning);
            }
            cmd::cmd_serve(&config, port, db_path, dev).await?;
        }
        Commands::Init { db_path } => cmd::cmd_init(&config, db_path)?,
        Commands::Import { file, db_path } => cmd::cmd_import(&config, &file, db_path)?,
        Commands::Config { command } => cmd::cmd_config(&config_path, &config, command)?,
    }

    Ok(())
}
