//! Error handling for Toolwatch
//!
//! Provides error types for every layer of the engine:
//! - Registry errors (validation of tool database operations)
//! - Persistence errors (loading and saving the tool database)
//! - Measurement errors (probe-based length measurement)
//! - Machine errors (reported by host collaborators)
//!
//! All error types use `thiserror` for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Registry error type
///
/// Validation failures of tool database operations. A registry operation that
/// returns one of these has not mutated any state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// A tool with this id is already registered
    #[error("Tool ID {tool_id} already exists")]
    DuplicateTool {
        /// The conflicting tool id.
        tool_id: u32,
    },

    /// No tool with this id is registered
    #[error("Tool ID {tool_id} not found")]
    ToolNotFound {
        /// The missing tool id.
        tool_id: u32,
    },

    /// The tool exists but is flagged inactive
    #[error("Tool {tool_id} is not active")]
    InactiveTool {
        /// The inactive tool id.
        tool_id: u32,
    },

    /// An operation needs a current tool but none is selected
    #[error("No tool selected")]
    NoToolSelected,

    /// An update request carried no recognized fields
    #[error("No parameters to update for tool {tool_id}")]
    EmptyUpdate {
        /// The tool the update was addressed to.
        tool_id: u32,
    },

    /// A field value could not be interpreted
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField {
        /// The field name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Persistence error type
///
/// Failures while reading or writing the tool database and export files.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The database file exists but cannot be decoded
    #[error("Corrupt tool database {path}: {reason}")]
    Corrupt {
        /// Path of the unreadable file.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// An import source does not exist
    #[error("File not found: {path}")]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },
}

/// Machine error type
///
/// Errors reported by the host-provided motion, probe and telemetry collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MachineError {
    /// The probe reached its travel bound without triggering
    #[error("No trigger on probe after full movement to Z={target_z:.3}")]
    ProbeSurfaceNotFound {
        /// The lower bound the probe move was sent to.
        target_z: f64,
    },

    /// A move was rejected or aborted by the motion system
    #[error("Motion failed: {reason}")]
    MotionFailed {
        /// The reason the move failed.
        reason: String,
    },

    /// Saved motion state could not be restored
    #[error("Motion state '{name}' could not be restored: {reason}")]
    StateRestoreFailed {
        /// The saved state name.
        name: String,
        /// The reason the restore failed.
        reason: String,
    },

    /// The collaborator is present but not ready
    #[error("Machine not ready: {reason}")]
    NotReady {
        /// The reason the machine is not ready.
        reason: String,
    },
}

/// Measurement error type
///
/// A measurement error aborts the whole measurement; no partial sample is kept.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasurementError {
    /// Repeated samples disagree by more than the configured tolerance
    #[error("Probe samples exceed tolerance: {range:.3}mm > {tolerance}mm")]
    ToleranceExceeded {
        /// max(samples) - min(samples)
        range: f64,
        /// The configured tolerance.
        tolerance: f64,
    },

    /// The probe surface was not found within the maximum probe distance
    #[error("Probe surface not found above Z={target_z:.3}")]
    SurfaceNotFound {
        /// The lower bound of the probe move.
        target_z: f64,
    },

    /// The sample count is zero
    #[error("Sample count must be at least 1")]
    NoSamples,

    /// Wear analysis needs a reference and a later measurement
    #[error("Tool {tool_id}: Only {count} measurement(s), need at least 2")]
    InsufficientHistory {
        /// The tool that was asked about.
        tool_id: u32,
        /// Measurements recorded so far.
        count: usize,
    },

    /// A motion step of the measurement failed
    #[error(transparent)]
    Machine(MachineError),
}

impl From<MachineError> for MeasurementError {
    fn from(err: MachineError) -> Self {
        match err {
            MachineError::ProbeSurfaceNotFound { target_z } => {
                MeasurementError::SurfaceNotFound { target_z }
            }
            other => MeasurementError::Machine(other),
        }
    }
}

/// Main error type for Toolwatch
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Registry validation error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Persistence error
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Measurement error
    #[error(transparent)]
    Measurement(#[from] MeasurementError),

    /// Machine collaborator error
    #[error(transparent)]
    Machine(#[from] MachineError),

    /// A feature was explicitly requested but its collaborator is not configured
    #[error("No {collaborator} configured")]
    CollaboratorMissing {
        /// Human readable collaborator name, e.g. "tool length probe".
        collaborator: &'static str,
    },

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Create a missing-collaborator error
    pub fn missing(collaborator: &'static str) -> Self {
        Error::CollaboratorMissing { collaborator }
    }

    /// Check if this is a validation error (no state was mutated)
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Registry(_))
    }

    /// Check if this is a measurement error
    pub fn is_measurement_error(&self) -> bool {
        matches!(self, Error::Measurement(_))
    }

    /// Check if this is a tolerance rejection
    pub fn is_tolerance_exceeded(&self) -> bool {
        matches!(
            self,
            Error::Measurement(MeasurementError::ToleranceExceeded { .. })
        )
    }

    /// Check if this is a persistence error
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, Error::Persistence(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
