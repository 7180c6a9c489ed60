//! User settings
//!
//! Manages settings stored in ~/.sqlhelpers/config.toml

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Schema used by the Postgres function-exists check when none is configured
pub const DEFAULT_SCHEMA_NAME: &str = "public";

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub tracking: TrackingSettings,
}

/// Defaults for tracking-enabled backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSettings {
    #[serde(default = "default_schema_name")]
    pub schema_name: String,

    /// Tables tracked when none are named on the command line
    #[serde(default)]
    pub tables: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_schema_name() -> String {
    DEFAULT_SCHEMA_NAME.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            tracking: TrackingSettings::default(),
        }
    }
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            schema_name: default_schema_name(),
            tables: Vec::new(),
        }
    }
}

/// Get the configuration directory path (~/.sqlhelpers)
pub fn config_dir() -> ConfigResult<PathBuf> {
    dirs::home_dir()
        .map(|h| h.join(".sqlhelpers"))
        .ok_or(ConfigError::NoHomeDir)
}

/// Load settings from the default config file, falling back to defaults
pub fn load_settings() -> ConfigResult<Settings> {
    let path = config_dir()?.join("config.toml");
    if !path.exists() {
        return Ok(Settings::default());
    }
    load_settings_from(&path)
}

/// Load settings from an explicit path, which must exist
pub fn load_settings_from(path: &Path) -> ConfigResult<Settings> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&content)?;
    Ok(settings)
}
