//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from a TOML file. Every section is optional and a
//! missing file is never fatal: the caller gets built-in defaults and a warning.
//!
//! Config file lookup order:
//! 1. Explicit path (`--config`), which must exist
//! 2. `TSF_CONFIG` environment variable
//! 3. `~/.config/tsf/config.toml`
//! 4. `/etc/tsf/config.toml`
//!
//! Root folder priority order:
//! 1. Command-line argument
//! 2. `TSF_ROOT_FOLDER` environment variable
//! 3. TOML `root_folder`
//! 4. OS-dependent default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TSF_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "TSF_ROOT_FOLDER";

/// Default database file name inside the root folder
pub const DEFAULT_DATABASE_FILE: &str = "tsf.db";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Database file, relative to the root folder unless absolute
    #[serde(default)]
    pub database_file: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Query service settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum number of ids returned by a Level-2 filter (0 = unlimited)
    #[serde(default = "default_level2_result_limit")]
    pub level2_result_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            level2_result_limit: default_level2_result_limit(),
        }
    }
}

/// Catalog refresh settings
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Language tag preferred when resolving localized feed text
    #[serde(default = "default_language")]
    pub language: String,

    /// Single-byte field delimiter of overlay files
    #[serde(default = "default_overlay_delimiter")]
    pub overlay_delimiter: char,

    /// Token standing for a missing trait score in overlay files
    #[serde(default = "default_null_token")]
    pub null_token: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            overlay_delimiter: default_overlay_delimiter(),
            null_token: default_null_token(),
        }
    }
}

/// Quiz client settings
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_level2_result_limit() -> usize {
    20
}

fn default_language() -> String {
    "de".to_string()
}

fn default_overlay_delimiter() -> char {
    ';'
}

fn default_null_token() -> String {
    "NULL".to_string()
}

fn default_base_url() -> String {
    format!("http://{}:{}", default_host(), default_port())
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Database file location for a resolved root folder
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        let file = self
            .database_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE));
        if file.is_absolute() {
            file
        } else {
            root_folder.join(file)
        }
    }
}

/// Load bootstrap configuration.
///
/// An explicit path that cannot be read or parsed is an error. Without one,
/// the first existing file from the lookup order is used; if none exists the
/// defaults are returned with a warning.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        info!("Loading config from {}", path.display());
        return TomlConfig::from_file(path);
    }

    match find_config_file() {
        Some(path) => {
            info!("Loading config from {}", path.display());
            TomlConfig::from_file(&path)
        }
        None => {
            warn!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Locate the config file following the lookup order
fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!("{} points to missing file {}", CONFIG_ENV_VAR, path.display());
    }

    let user_config = dirs::config_dir().map(|d| d.join("tsf").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/tsf/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Resolve the root folder: CLI > environment > TOML > OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("tsf"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\tsf"))
    } else {
        dirs::data_local_dir()
            .map(|d| d.join("tsf"))
            .unwrap_or_else(|| PathBuf::from("./tsf_data"))
    }
}
