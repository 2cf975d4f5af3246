//! Bootstrap configuration loading
//!
//! Configuration is resolved with the following priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and compiled
//! defaults are used. A TOML file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "ACE_STUDIO_CONFIG";

/// Environment variable overriding the backend base URL
pub const BACKEND_URL_ENV: &str = "ACE_BACKEND_URL";

/// Default backend base URL (ACE-Step backend standard port)
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Default port for the orchestrator's local HTTP surface
pub const DEFAULT_LISTEN_PORT: u16 = 5780;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Backend base URL (e.g. `http://127.0.0.1:8000`)
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Port for the local HTTP surface
    #[serde(default)]
    pub listen_port: Option<u16>,

    /// Overrides the backend's configured image provider ("none" disables cover prompts)
    #[serde(default)]
    pub image_generation_provider: Option<String>,

    /// Overrides the backend's preferred model variant
    #[serde(default)]
    pub default_model_variant: Option<String>,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Poll intervals for the periodic ticks
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// History reconciliation interval (default 2000ms)
    #[serde(default = "default_history_interval_ms")]
    pub history_interval_ms: u64,

    /// Model inventory interval (default 5000ms)
    #[serde(default = "default_inventory_interval_ms")]
    pub inventory_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            history_interval_ms: default_history_interval_ms(),
            inventory_interval_ms: default_inventory_interval_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_history_interval_ms() -> u64 {
    2000
}

fn default_inventory_interval_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve which config file to read, if any
///
/// CLI path → `ACE_STUDIO_CONFIG` → `<config_dir>/ace-studio/config.toml`.
/// Returns `None` when no candidate exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|path| path.exists())
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ace-studio").join("config.toml"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Load the config file if present, otherwise fall back to compiled defaults
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    match path {
        Some(path) if path.exists() => {
            let config = load_toml_config(path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            info!("No config file found, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

fn validate(config: &TomlConfig) -> Result<()> {
    if config.polling.history_interval_ms == 0 {
        return Err(Error::Config(
            "polling.history_interval_ms must be greater than zero".to_string(),
        ));
    }
    if config.polling.inventory_interval_ms == 0 {
        return Err(Error::Config(
            "polling.inventory_interval_ms must be greater than zero".to_string(),
        ));
    }
    if let Some(url) = &config.backend_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "backend_url must be an http(s) URL: {}",
                url
            )));
        }
    }
    Ok(())
}
