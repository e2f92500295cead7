//! Error types for the settings crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, saving or validating a configuration file.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The file could not be read or written.
    #[error("Cannot access {path}: {source}")]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file content is not valid for its format.
    #[error("Cannot parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// The configuration could not be rendered.
    #[error("Cannot serialize configuration: {0}")]
    Serialize(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A monitoring section rejected its values.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] toolwatch_core::Error),
}

impl SettingsError {
    pub(crate) fn access(path: &std::path::Path, source: io::Error) -> Self {
        Self::Access {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Configuration validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

pub type SettingsResult<T> = Result<T, SettingsError>;
