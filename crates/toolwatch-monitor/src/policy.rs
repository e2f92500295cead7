//! Action policy
//!
//! Maps a detector trigger to a machine action. Which action runs for which
//! trigger is static configuration.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use toolwatch_core::types::{EmergencyStopHandle, PauseHandle};
use toolwatch_core::{Error, EventBus, MonitoringEvent, ToolwatchEvent};

/// Reaction to a detector trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorAction {
    /// Pause the running job
    Pause,
    /// Emergency stop
    Stop,
    /// Log and keep going
    Continue,
}

impl MonitorAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Continue => "continue",
        }
    }
}

impl std::fmt::Display for MonitorAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MonitorAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pause" => Ok(Self::Pause),
            "stop" => Ok(Self::Stop),
            "continue" => Ok(Self::Continue),
            other => Err(Error::other(format!(
                "Unknown action '{}', expected pause, stop or continue",
                other
            ))),
        }
    }
}

/// Executes [`MonitorAction`]s against the host's pause and emergency stop
pub struct ActionPolicy {
    pause: Option<PauseHandle>,
    emergency_stop: Option<EmergencyStopHandle>,
    events: Arc<EventBus>,
}

impl ActionPolicy {
    pub fn new(
        pause: Option<PauseHandle>,
        emergency_stop: Option<EmergencyStopHandle>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            pause,
            emergency_stop,
            events,
        }
    }

    /// Run `action`. Returns false when the needed collaborator is missing.
    pub fn execute(&self, action: MonitorAction, reason: &str) -> bool {
        let executed = match action {
            MonitorAction::Pause => match &self.pause {
                Some(pause) => {
                    tracing::warn!("Pausing job: {}", reason);
                    pause.pause();
                    true
                }
                None => {
                    tracing::error!("Cannot pause ({}): no pause control configured", reason);
                    false
                }
            },
            MonitorAction::Stop => match &self.emergency_stop {
                Some(estop) => {
                    tracing::error!("Emergency stop: {}", reason);
                    estop.trigger();
                    true
                }
                None => {
                    tracing::error!(
                        "Cannot stop ({}): no emergency stop configured",
                        reason
                    );
                    false
                }
            },
            MonitorAction::Continue => {
                tracing::warn!("Continuing after: {}", reason);
                true
            }
        };

        if executed {
            self.events
                .emit(ToolwatchEvent::Monitoring(MonitoringEvent::ActionExecuted {
                    action: action.to_string(),
                    reason: reason.to_string(),
                }));
        }
        executed
    }

    pub fn can_pause(&self) -> bool {
        self.pause.is_some()
    }

    pub fn can_stop(&self) -> bool {
        self.emergency_stop.is_some()
    }
}

impl std::fmt::Debug for ActionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionPolicy")
            .field("pause", &self.pause.is_some())
            .field("emergency_stop", &self.emergency_stop.is_some())
            .finish()
    }
}
