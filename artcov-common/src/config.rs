//! Configuration loading
//!
//! Config file resolution order:
//! 1. Command-line argument (highest priority)
//! 2. `ARTCOV_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/artcov/config.toml` on Linux)
//! 4. Compiled defaults (fallback)
//!
//! A missing config file never aborts startup: a warning is logged and the
//! compiled defaults are used. A file that exists but does not parse is an
//! error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::grid::DEFAULT_PRECISION;
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ARTCOV_CONFIG";

/// Application configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Score presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Decimals shown for `l`, `c`, `h` and C_nu
    #[serde(default = "default_precision")]
    pub precision: usize,

    /// Sort articles by descending `h` right after loading
    #[serde(default)]
    pub sort_on_load: bool,
}

/// Names given to subjects and articles created without one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_subject_name")]
    pub subject_name: String,

    #[serde(default = "default_article_name")]
    pub article_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            sort_on_load: false,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            subject_name: default_subject_name(),
            article_name: default_article_name(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_precision() -> usize {
    DEFAULT_PRECISION
}

fn default_subject_name() -> String {
    "New Subject".to_string()
}

fn default_article_name() -> String {
    "New Article".to_string()
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("artcov").join("config.toml"))
}

/// Resolves which config file to use and loads it
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Config file path by priority, `None` when no source names one
    pub fn resolve_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory, only if the file exists
        default_config_path().filter(|p| p.exists())
    }

    /// Load the resolved config, falling back to compiled defaults
    pub fn load(&self) -> Result<AppConfig> {
        let Some(path) = self.resolve_path() else {
            info!("No config file found, using compiled defaults");
            return Ok(AppConfig::default());
        };

        if !path.exists() {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            return Ok(AppConfig::default());
        }

        let config = load_config_file(&path)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Parse a TOML config file
pub fn load_config_file(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Write a config file atomically (temp file + rename)
pub fn write_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;

    Ok(())
}
