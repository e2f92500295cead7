//! Configuration management for Toolwatch
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats stored in platform-specific directories.
//!
//! Configuration is organized into sections:
//! - Registry settings (database location, load mode)
//! - Monitoring (detector flags, thresholds, actions)
//! - Tool length probe (optional)

use crate::error::{ConfigError, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use toolwatch_core::LoadMode;
use toolwatch_monitor::{MonitoringConfig, ProbeConfig};

const APP_DIR: &str = "toolwatch";
const CONFIG_FILE: &str = "config.toml";

/// Platform config directory for Toolwatch, falling back to the home directory
pub fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default location of the configuration file
pub fn default_config_path() -> PathBuf {
    default_data_dir().join(CONFIG_FILE)
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat(format!(
                "{} (config file must be .json or .toml)",
                other.unwrap_or("no extension")
            ))),
        }
    }
}

/// Tool database settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Directory holding the tool database
    pub data_dir: PathBuf,
    /// Database file name inside `data_dir`
    pub file_name: String,
    /// Fail on a corrupt database instead of moving it aside
    pub strict_load: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_name: "tool_database.json".to_string(),
            strict_load: false,
        }
    }
}

impl RegistrySettings {
    /// Full path of the tool database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }

    pub fn load_mode(&self) -> LoadMode {
        if self.strict_load {
            LoadMode::Strict
        } else {
            LoadMode::Recover
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tool database settings
    pub registry: RegistrySettings,
    /// Detector and loop settings
    pub monitoring: MonitoringConfig,
    /// Tool length probe; probe features are disabled without it
    pub probe: Option<ProbeConfig>,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::access(path, e))?;

        let config: Self = match format {
            ConfigFormat::Json => {
                serde_json::from_str(&content).map_err(|e| SettingsError::parse(path, e))?
            }
            ConfigFormat::Toml => {
                toml::from_str(&content).map_err(|e| SettingsError::parse(path, e))?
            }
        };

        config.validate()?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load config from `path`, or defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            tracing::info!(
                "No configuration at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| SettingsError::Serialize(e.to_string()))?,
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| SettingsError::Serialize(e.to_string()))?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::access(parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| SettingsError::access(path, e))?;
        tracing::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.registry.file_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "registry.file_name".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        self.monitoring.validate()?;

        if let Some(probe) = &self.probe {
            probe.validate().map_err(|reason| ConfigError::InvalidValue {
                key: "probe".to_string(),
                reason,
            })?;
        }

        Ok(())
    }
}
