//! Toolwatch Settings Crate
//!
//! Loads, validates and saves the engine configuration: where the tool
//! database lives, the monitoring thresholds and the optional tool length
//! probe.

pub mod config;
pub mod error;

pub use config::{default_config_path, default_data_dir, Config, ConfigFormat, RegistrySettings};
pub use error::{ConfigError, SettingsError, SettingsResult};
