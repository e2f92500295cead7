//! Monitoring configuration
//!
//! Detector enable flags, thresholds and the action policy selection.
//! Every field has a default so partial configuration files load.

use crate::policy::MonitorAction;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolwatch_core::{Error, Result};

/// Longest accepted tick period, in seconds (one day)
pub const MAX_CHECK_INTERVAL_SECS: f64 = 86_400.0;

/// Tick period used when the configured one cannot be represented
const FALLBACK_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Detector and loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enable_collision_detection: bool,
    pub enable_break_detection: bool,
    pub enable_wear_monitoring: bool,
    pub enable_probe_wear_detection: bool,

    /// Per-axis acceleration spike that counts as a collision
    pub collision_acceleration_threshold: f64,
    /// Seconds between monitoring ticks
    pub wear_check_interval: f64,

    /// Length loss in mm that counts as probe-detected wear
    pub probe_wear_threshold: f64,
    /// Probe wear is evaluated every this many completed jobs
    pub probe_wear_check_frequency: u32,
    /// Length loss in mm that counts as fully worn
    pub probe_max_wear: f64,

    /// Current ratio below which the tool counts as broken
    pub break_spindle_current_threshold: f64,

    pub action_on_collision: MonitorAction,
    pub action_on_break: MonitorAction,

    /// Skip detector evaluation while a probe sequence moves the machine
    pub suspend_during_probe: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_collision_detection: true,
            enable_break_detection: true,
            enable_wear_monitoring: true,
            enable_probe_wear_detection: false,
            collision_acceleration_threshold: 5000.0,
            wear_check_interval: 60.0,
            probe_wear_threshold: 0.5,
            probe_wear_check_frequency: 5,
            probe_max_wear: 2.0,
            break_spindle_current_threshold: 0.5,
            action_on_collision: MonitorAction::Pause,
            action_on_break: MonitorAction::Stop,
            suspend_during_probe: true,
        }
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::other(format!("{} must be > 0, got {}", name, value)))
    }
}

impl MonitoringConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        positive(
            "collision_acceleration_threshold",
            self.collision_acceleration_threshold,
        )?;
        positive("wear_check_interval", self.wear_check_interval)?;
        if self.wear_check_interval > MAX_CHECK_INTERVAL_SECS {
            return Err(Error::other(format!(
                "wear_check_interval must be at most {}s, got {}",
                MAX_CHECK_INTERVAL_SECS, self.wear_check_interval
            )));
        }
        positive("probe_wear_threshold", self.probe_wear_threshold)?;
        positive("probe_max_wear", self.probe_max_wear)?;
        positive(
            "break_spindle_current_threshold",
            self.break_spindle_current_threshold,
        )?;

        if self.probe_wear_check_frequency == 0 {
            return Err(Error::other(
                "probe_wear_check_frequency must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Tick period. Values that do not fit a `Duration` fall back to 60 s.
    pub fn check_interval(&self) -> Duration {
        match Duration::try_from_secs_f64(self.wear_check_interval) {
            Ok(interval) if !interval.is_zero() => interval,
            _ => {
                tracing::warn!(
                    "Unusable wear_check_interval {}, ticking every {}s",
                    self.wear_check_interval,
                    FALLBACK_CHECK_INTERVAL.as_secs()
                );
                FALLBACK_CHECK_INTERVAL
            }
        }
    }

    /// Apply runtime parameter changes after validating them
    pub fn apply(&mut self, params: &MonitoringParams) -> Result<()> {
        let mut next = self.clone();
        if let Some(v) = params.collision_threshold {
            next.collision_acceleration_threshold = v;
        }
        if let Some(v) = params.break_threshold {
            next.break_spindle_current_threshold = v;
        }
        if let Some(v) = params.wear_check_interval {
            next.wear_check_interval = v;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

/// Runtime-adjustable thresholds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringParams {
    pub collision_threshold: Option<f64>,
    pub break_threshold: Option<f64>,
    pub wear_check_interval: Option<f64>,
}

impl MonitoringParams {
    pub fn is_empty(&self) -> bool {
        *self == MonitoringParams::default()
    }
}
