//! Application configuration, read from `.casedesk/casedesk.toml`.
//!
//! Values are layered: file, then environment, then CLI flags (applied by
//! the `serve` command). Every section is optional.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3141
//! dev = false
//!
//! [database]
//! path = ".casedesk/casedesk.db"
//!
//! [storage]
//! root = ".casedesk/storage"
//! public_base_url = "http://127.0.0.1:3141/storage"
//!
//! [logging]
//! level = "info"
//! json = false
//! directory = ".casedesk/logs"
//!
//! [sync]
//! channel_capacity = 256
//! ```
//!
//! Environment overrides: `CASEDESK_PORT`, `CASEDESK_DB_PATH`,
//! `CASEDESK_STORAGE_ROOT`. A `.env` file in the working directory is loaded
//! by the binary before the config is read.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = ".casedesk";
pub const CONFIG_FILE: &str = "casedesk.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Enables permissive CORS for a separately served front end.
    pub dev: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3141,
            dev: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: PathBuf,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(CONFIG_DIR).join("casedesk.db"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory holding one sub-directory per bucket.
    pub root: Option<PathBuf>,
    /// Prefix of public object URLs. Derived from the server address when
    /// unset.
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub json: bool,
    /// Daily-rolling log files are written here when set.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Buffered change events per subscriber before it starts lagging.
    pub channel_capacity: usize,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Parsed `casedesk.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub storage: StorageSection,
    pub logging: LoggingSection,
    pub sync: SyncSection,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse casedesk.toml")
    }

    /// Load from `path`, or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize casedesk.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `CASEDESK_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("CASEDESK_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid CASEDESK_PORT '{}'", port))?;
        }
        if let Some(path) = lookup("CASEDESK_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(root) = lookup("CASEDESK_STORAGE_ROOT") {
            self.storage.root = Some(PathBuf::from(root));
        }
        Ok(())
    }

    /// Storage root, defaulting to `storage/` beside the database file.
    pub fn storage_root(&self) -> PathBuf {
        self.storage.root.clone().unwrap_or_else(|| {
            self.database
                .path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("storage")
        })
    }

    pub fn public_base_url(&self) -> String {
        self.storage
            .public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}/storage", self.server.host, self.server.port))
    }

    /// Non-fatal problems with the configuration.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            warnings.push(format!(
                "Unknown logging level '{}'. Valid values: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
        if self.server.port == 0 {
            warnings.push("server.port is 0; the OS will pick a random port".to_string());
        }
        if self.sync.channel_capacity == 0 {
            warnings.push("sync.channel_capacity must be at least 1".to_string());
        }
        if let Some(url) = &self.storage.public_base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            warnings.push(format!(
                "storage.public_base_url '{}' is not an http(s) URL",
                url
            ));
        }

        warnings
    }
}

/// Default config path under `project_dir`.
pub fn default_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR).join(CONFIG_FILE)
}
