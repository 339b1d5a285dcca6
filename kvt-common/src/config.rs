//! Configuration loading and root folder resolution
//!
//! Configuration is read once at startup from a TOML file and is immutable
//! afterwards. File location priority:
//! 1. Explicit path (command-line argument or `KVT_CONFIG`, resolved by the binary)
//! 2. `{config_dir}/kvt/config.toml`
//! 3. Compiled defaults (no file)
//!
//! Every section is optional; missing keys fall back to defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Feed size returned by the activity-count operations
pub const FEED_COUNT_LIMIT: i64 = 100;

/// Full application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub ingest: IngestConfig,
    pub executor: ExecutorConfig,
    pub feeds: FeedConfig,
    pub sessions: SessionConfig,
    pub logging: LoggingConfig,
}

/// Store connection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file; defaults to `{root_folder}/kvt.db`
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    /// Upper bound on retrying a write that hit a locked database
    pub max_lock_wait_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 8,
            max_lock_wait_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2345,
        }
    }
}

/// Where indexed audio and artwork live
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Defaults to the platform data directory (`~/.local/share/kvt` on Linux)
    pub root_folder: Option<PathBuf>,
}

/// How ingested metadata is confirmed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmMode {
    /// Accept parsed tags as-is (headless)
    #[default]
    Auto,
    /// Ask an operator on the console for every file
    Console,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub enabled: bool,
    /// Defaults to `{root_folder}/staging`
    pub staging_dir: Option<PathBuf>,
    pub scan_interval_secs: u64,
    pub confirm: ConfirmMode,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            staging_dir: None,
            scan_interval_secs: 30,
            confirm: ConfirmMode::Auto,
        }
    }
}

/// Worker pool for store operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub workers: usize,
    pub call_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            call_timeout_ms: 10_000,
        }
    }
}

/// How feed counts relate to [`FEED_COUNT_LIMIT`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedCountMode {
    /// `max(FEED_COUNT_LIMIT, actual)`: never reports fewer than the limit
    #[default]
    Floor,
    /// `min(FEED_COUNT_LIMIT, actual)`: caps the reported feed size
    Cap,
}

impl FeedCountMode {
    pub fn apply(self, actual: i64) -> i64 {
        match self {
            FeedCountMode::Floor => actual.max(FEED_COUNT_LIMIT),
            FeedCountMode::Cap => actual.min(FEED_COUNT_LIMIT),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub count_mode: FeedCountMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Tokens older than this stop validating; `None` keeps them until the next login
    pub token_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Resolved library root folder
    pub fn root_folder(&self) -> PathBuf {
        self.library
            .root_folder
            .clone()
            .unwrap_or_else(default_root_folder)
    }

    /// Resolved SQLite database path
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| self.root_folder().join("kvt.db"))
    }

    /// Resolved staging directory scanned by ingestion
    pub fn staging_dir(&self) -> PathBuf {
        self.ingest
            .staging_dir
            .clone()
            .unwrap_or_else(|| self.root_folder().join("staging"))
    }

    /// Apply command-line overrides (highest priority)
    pub fn apply_overrides(
        &mut self,
        root_folder: Option<PathBuf>,
        staging_dir: Option<PathBuf>,
        port: Option<u16>,
    ) {
        if let Some(root) = root_folder {
            self.library.root_folder = Some(root);
        }
        if let Some(staging) = staging_dir {
            self.ingest.staging_dir = Some(staging);
        }
        if let Some(port) = port {
            self.server.port = port;
        }
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.executor.workers == 0 {
            return Err(Error::Config("executor.workers must be at least 1".to_string()));
        }
        if self.executor.call_timeout_ms == 0 {
            return Err(Error::Config(
                "executor.call_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.ingest.scan_interval_secs == 0 {
            return Err(Error::Config(
                "ingest.scan_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.sessions.token_ttl_secs == Some(0) {
            return Err(Error::Config(
                "sessions.token_ttl_secs must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration
///
/// An explicit path must exist. Without one, the platform config file is used
/// when present, otherwise compiled defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path.to_path_buf())
        }
        None => default_config_path().filter(|p| p.exists()),
    };

    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
            let config = AppConfig::from_toml_str(&content)?;
            info!("Configuration loaded from {}", path.display());
            config
        }
        None => {
            warn!("No config file found, using compiled defaults");
            AppConfig::default()
        }
    };

    config.validate()?;
    Ok(config)
}

/// Platform config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kvt").join("config.toml"))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("kvt"))
        .unwrap_or_else(|| PathBuf::from("./kvt_data"))
}
