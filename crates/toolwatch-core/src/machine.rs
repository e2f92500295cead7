//! Machine collaborators
//!
//! The engine never talks to hardware directly. Position, spindle telemetry,
//! probing, motion and the safety actions are provided by the host through the
//! traits in this module.

use crate::error::MachineError;
use serde::{Deserialize, Serialize};

/// Position in 3D space with optional fourth axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X-axis position
    pub x: f64,
    /// Y-axis position
    pub y: f64,
    /// Z-axis position
    pub z: f64,
    /// Fourth axis (A) if present
    pub a: Option<f64>,
}

impl Position {
    /// Create a new position with X, Y, Z coordinates
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, a: None }
    }

    /// Linear axes as an array
    pub fn linear(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Copy of this position with Z replaced
    pub fn with_z(&self, z: f64) -> Self {
        Self { z, ..*self }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.a {
            Some(a) => write!(
                f,
                "X:{:.3} Y:{:.3} Z:{:.3} A:{:.3}",
                self.x, self.y, self.z, a
            ),
            None => write!(f, "X:{:.3} Y:{:.3} Z:{:.3}", self.x, self.y, self.z),
        }
    }
}

/// Spindle telemetry sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpindleStatus {
    /// Commanded speed; zero means stopped
    pub speed: f64,
    /// Measured load current, when the hardware reports one
    pub current: Option<f64>,
}

impl SpindleStatus {
    /// Whether the spindle is turning
    pub fn is_running(&self) -> bool {
        self.speed > 0.0
    }
}

/// Source of the current toolhead position
pub trait PositionSource: Send + Sync {
    fn position(&self) -> Position;
}

/// Source of spindle speed and load current
pub trait SpindleTelemetry: Send + Sync {
    fn status(&self) -> SpindleStatus;
}

/// Probing move toward a surface
pub trait MotionProbe: Send + Sync {
    /// Move Z down toward `target_z` at `speed` until the probe triggers.
    ///
    /// Returns the Z height at which the probe triggered, or
    /// [`MachineError::ProbeSurfaceNotFound`] if it reached `target_z` first.
    fn probe(&self, target_z: f64, speed: f64) -> Result<f64, MachineError>;
}

/// Motion commands used by measurement sequences
pub trait MotionController: Send + Sync {
    /// Move to `position` at `speed` (mm/s)
    fn move_to(&self, position: Position, speed: f64) -> Result<(), MachineError>;

    /// Block until all queued moves have completed
    fn wait_until_idle(&self) -> Result<(), MachineError>;

    /// Save the modal motion state under `name`
    fn save_state(&self, name: &str) -> Result<(), MachineError>;

    /// Restore the modal motion state saved under `name`
    fn restore_state(&self, name: &str) -> Result<(), MachineError>;

    /// Current toolhead position
    fn position(&self) -> Position;
}

/// Pauses the running job
pub trait PauseControl: Send + Sync {
    fn pause(&self);
}

/// Stops all motion immediately
pub trait EmergencyStop: Send + Sync {
    fn trigger(&self);
}
