//! Event type definitions for the event bus.
//!
//! This module defines all engine events organized by category.
//! Events are designed to be cloneable and serializable for logging/replay.

use serde::{Deserialize, Serialize};

/// Root event enum for all engine events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolwatchEvent {
    /// Tool database changes and selection warnings
    Registry(RegistryEvent),
    /// Monitoring loop and detector events
    Monitoring(MonitoringEvent),
    /// Tool length measurement events
    Measurement(MeasurementEvent),
}

impl ToolwatchEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            ToolwatchEvent::Registry(_) => EventCategory::Registry,
            ToolwatchEvent::Monitoring(_) => EventCategory::Monitoring,
            ToolwatchEvent::Measurement(_) => EventCategory::Measurement,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            ToolwatchEvent::Registry(e) => e.description(),
            ToolwatchEvent::Monitoring(e) => e.description(),
            ToolwatchEvent::Measurement(e) => e.description(),
        }
    }

    /// True for events that ask for operator attention
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ToolwatchEvent::Registry(RegistryEvent::WearWarning { .. })
                | ToolwatchEvent::Registry(RegistryEvent::ReplacementWarning { .. })
                | ToolwatchEvent::Monitoring(MonitoringEvent::CollisionDetected { .. })
                | ToolwatchEvent::Monitoring(MonitoringEvent::BreakDetected { .. })
                | ToolwatchEvent::Monitoring(MonitoringEvent::WearAlert { .. })
                | ToolwatchEvent::Monitoring(MonitoringEvent::ReplacementRequired { .. })
                | ToolwatchEvent::Monitoring(MonitoringEvent::ProbeWearDetected { .. })
        )
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Tool database events.
    Registry,
    /// Monitoring loop and detector events.
    Monitoring,
    /// Tool length measurement events.
    Measurement,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Registry => write!(f, "Registry"),
            EventCategory::Monitoring => write!(f, "Monitoring"),
            EventCategory::Measurement => write!(f, "Measurement"),
        }
    }
}

/// Tool database events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A tool was added.
    ToolAdded {
        /// Id of the new tool.
        tool_id: u32,
        /// Display name.
        name: String,
    },
    /// Tool parameters changed.
    ToolUpdated {
        /// Id of the updated tool.
        tool_id: u32,
    },
    /// A tool was removed.
    ToolRemoved {
        /// Id of the removed tool.
        tool_id: u32,
    },
    /// A tool became the current tool.
    ToolSelected {
        /// Id of the selected tool.
        tool_id: u32,
    },
    /// The selected tool is above its wear warning threshold.
    WearWarning {
        /// Id of the tool.
        tool_id: u32,
        /// Wear level in percent.
        wear_level: f64,
    },
    /// The selected tool is worn out.
    ReplacementWarning {
        /// Id of the tool.
        tool_id: u32,
    },
    /// A tool was taken out of service.
    ToolDeactivated {
        /// Id of the tool.
        tool_id: u32,
    },
    /// Usage counters were reset.
    StatsReset {
        /// Id of the tool.
        tool_id: u32,
    },
    /// Tools were imported from a file.
    ToolsImported {
        /// Number of tools written.
        imported: usize,
        /// Number of tools skipped because the id existed.
        skipped: usize,
    },
    /// Writing the database failed; in-memory state is unpersisted.
    SaveFailed {
        /// Failure description.
        reason: String,
    },
}

impl RegistryEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            RegistryEvent::ToolAdded { tool_id, name } => {
                format!("Tool {} '{}' added to database", tool_id, name)
            }
            RegistryEvent::ToolUpdated { tool_id } => format!("Tool {} updated", tool_id),
            RegistryEvent::ToolRemoved { tool_id } => {
                format!("Tool {} removed from database", tool_id)
            }
            RegistryEvent::ToolSelected { tool_id } => format!("Tool {} selected", tool_id),
            RegistryEvent::WearWarning {
                tool_id,
                wear_level,
            } => format!("WARNING: Tool {} wear level at {:.1}%", tool_id, wear_level),
            RegistryEvent::ReplacementWarning { tool_id } => {
                format!("WARNING: Tool {} needs replacement!", tool_id)
            }
            RegistryEvent::ToolDeactivated { tool_id } => {
                format!("Tool {} marked inactive", tool_id)
            }
            RegistryEvent::StatsReset { tool_id } => format!("Tool {} statistics reset", tool_id),
            RegistryEvent::ToolsImported { imported, skipped } => {
                format!("Imported {} tools, skipped {}", imported, skipped)
            }
            RegistryEvent::SaveFailed { reason } => {
                format!("Error saving tool database: {}", reason)
            }
        }
    }
}

/// Monitoring loop and detector events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitoringEvent {
    /// The monitoring loop was armed.
    Started,
    /// The monitoring loop was disarmed.
    Stopped,
    /// An acceleration spike exceeded the collision threshold.
    CollisionDetected {
        /// Largest per-axis acceleration of the tick.
        acceleration: f64,
        /// Collision counter after this trigger.
        count: u32,
    },
    /// Spindle current dropped below the break threshold.
    BreakDetected {
        /// Observed current divided by baseline.
        current_ratio: f64,
        /// Tool marked inactive, if one was selected.
        tool_id: Option<u32>,
    },
    /// The current tool crossed its wear warning threshold.
    WearAlert {
        /// Id of the tool.
        tool_id: u32,
        /// Wear level in percent.
        wear_level: f64,
    },
    /// The current tool needs replacement.
    ReplacementRequired {
        /// Id of the tool.
        tool_id: u32,
    },
    /// Measured length loss exceeded the probe wear threshold.
    ProbeWearDetected {
        /// Id of the tool.
        tool_id: u32,
        /// Length loss in mm.
        wear_mm: f64,
        /// Wear estimate derived from the loss.
        wear_percent: f64,
    },
    /// Latches were returned to idle.
    LatchesReset,
    /// Baseline spindle current was calibrated.
    BaselineCalibrated {
        /// The new baseline.
        current: f64,
    },
    /// The action policy ran.
    ActionExecuted {
        /// Action name (pause, stop, continue).
        action: String,
        /// What triggered it.
        reason: String,
    },
}

impl MonitoringEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            MonitoringEvent::Started => "Tool monitoring started".to_string(),
            MonitoringEvent::Stopped => "Tool monitoring stopped".to_string(),
            MonitoringEvent::CollisionDetected {
                acceleration,
                count,
            } => format!(
                "COLLISION DETECTED: acceleration spike {:.1} (total {})",
                acceleration, count
            ),
            MonitoringEvent::BreakDetected { current_ratio, .. } => format!(
                "TOOL BREAK DETECTED: spindle current dropped to {:.1}% of baseline",
                current_ratio * 100.0
            ),
            MonitoringEvent::WearAlert {
                tool_id,
                wear_level,
            } => format!("WARNING: Tool {} wear level at {:.1}%", tool_id, wear_level),
            MonitoringEvent::ReplacementRequired { tool_id } => {
                format!("CRITICAL: Tool {} needs replacement!", tool_id)
            }
            MonitoringEvent::ProbeWearDetected {
                tool_id, wear_mm, ..
            } => format!("PROBE WEAR DETECTED: Tool {} has worn {:.3}mm", tool_id, wear_mm),
            MonitoringEvent::LatchesReset => "Collision detection reset".to_string(),
            MonitoringEvent::BaselineCalibrated { current } => {
                format!("Baseline calibrated: {:.2}A", current)
            }
            MonitoringEvent::ActionExecuted { action, reason } => {
                format!("Action '{}' executed: {}", action, reason)
            }
        }
    }
}

/// Tool length measurement events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeasurementEvent {
    /// A measurement started.
    Started {
        /// Tool being measured, when known.
        tool_id: Option<u32>,
    },
    /// A measurement finished.
    Completed {
        /// Tool the result was recorded for, when stored.
        tool_id: Option<u32>,
        /// Aggregated length.
        length: f64,
        /// Number of samples taken.
        samples: usize,
    },
    /// A measurement was aborted.
    Failed {
        /// Failure description.
        reason: String,
    },
}

impl MeasurementEvent {
    /// Get a short description of this event
    pub fn description(&self) -> String {
        match self {
            MeasurementEvent::Started { .. } => "Starting tool length measurement...".to_string(),
            MeasurementEvent::Completed { length, samples, .. } => {
                format!("Measured Z: {:.3}mm ({} samples)", length, samples)
            }
            MeasurementEvent::Failed { reason } => {
                format!("Tool length measurement failed: {}", reason)
            }
        }
    }
}
