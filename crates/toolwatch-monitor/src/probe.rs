//! Tool length probe
//!
//! Measures the Z height at which the tool touches a fixed probe surface.
//! Multiple samples are taken per measurement; if they disagree by more
//! than the tolerance the whole measurement is rejected.
//!
//! Sequence:
//! 1. Save the motion state (restored on every exit path)
//! 2. Lift to `z + 10`, move over the probe, wait for idle
//! 3. Probe N times, retracting by `sample_retract_dist` between samples
//! 4. Check tolerance, aggregate, retract by `sample_retract_dist + 5`

use crate::suspension::DetectorSuspension;
use serde::{Deserialize, Serialize};
use toolwatch_core::types::{MotionHandle, ProbeHandle};
use toolwatch_core::{MachineError, MeasurementError, MotionController, Position};

/// Name under which the caller's motion state is saved
pub const PROBE_STATE_NAME: &str = "tool_probe_state";

/// Clearance above the probe surface for the approach move
const SAFE_HEIGHT: f64 = 10.0;

/// Extra lift after the last sample
const FINAL_RETRACT_EXTRA: f64 = 5.0;

/// How repeated samples are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleAggregation {
    #[default]
    Average,
    /// Element at index `n / 2` of the sorted samples
    Median,
}

impl SampleAggregation {
    pub fn aggregate(&self, samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        match self {
            SampleAggregation::Average => {
                Some(samples.iter().sum::<f64>() / samples.len() as f64)
            }
            SampleAggregation::Median => {
                let mut sorted = samples.to_vec();
                sorted.sort_by(f64::total_cmp);
                Some(sorted[sorted.len() / 2])
            }
        }
    }
}

/// Probe location and sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub x: f64,
    pub y: f64,
    /// Height of the probe surface
    pub z: f64,
    /// Probing speed, mm/s
    pub speed: f64,
    /// Lift and retract speed, mm/s
    pub lift_speed: f64,
    pub samples: usize,
    pub sample_retract_dist: f64,
    pub samples_result: SampleAggregation,
    pub samples_tolerance: f64,
    /// How far below the surface a probe move may travel
    pub max_probe_distance: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            speed: 5.0,
            lift_speed: 10.0,
            samples: 3,
            sample_retract_dist: 2.0,
            samples_result: SampleAggregation::Average,
            samples_tolerance: 0.01,
            max_probe_distance: 50.0,
        }
    }
}

impl ProbeConfig {
    /// Probe surface at the given location with default sampling
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            ..Default::default()
        }
    }

    /// Height of the approach move
    pub fn safe_z(&self) -> f64 {
        self.z + SAFE_HEIGHT
    }

    /// Lower bound of every probe move
    pub fn target_z(&self) -> f64 {
        self.z - self.max_probe_distance
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.samples == 0 {
            return Err("samples must be at least 1".to_string());
        }
        for (name, value) in [
            ("speed", self.speed),
            ("lift_speed", self.lift_speed),
            ("max_probe_distance", self.max_probe_distance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("{} must be > 0, got {}", name, value));
            }
        }
        if self.sample_retract_dist < 0.0 || self.samples_tolerance < 0.0 {
            return Err("retract distance and tolerance must not be negative".to_string());
        }
        Ok(())
    }
}

/// A successful measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeMeasurement {
    /// Aggregated Z height
    pub result: f64,
    pub samples: Vec<f64>,
    /// max - min of the samples
    pub range: f64,
}

/// Probe snapshot for status reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeStatus {
    pub last_result: Option<f64>,
    pub last_samples: Vec<f64>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub samples: usize,
}

/// Saved motion state. [`SavedMotionState::restore`] hands back the
/// restore result; if the guard is dropped instead (an error path), the
/// restore is attempted there and a failure can only be logged.
struct SavedMotionState<'a> {
    motion: &'a dyn MotionController,
    name: &'static str,
    armed: bool,
}

impl<'a> SavedMotionState<'a> {
    fn save(motion: &'a dyn MotionController, name: &'static str) -> Result<Self, MachineError> {
        motion.save_state(name)?;
        Ok(Self {
            motion,
            name,
            armed: true,
        })
    }

    fn restore(mut self) -> Result<(), MachineError> {
        self.armed = false;
        self.motion.restore_state(self.name)
    }
}

impl Drop for SavedMotionState<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.motion.restore_state(self.name) {
            tracing::error!("Failed to restore motion state '{}': {}", self.name, e);
        }
    }
}

fn sample_range(samples: &[f64]) -> f64 {
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    max - min
}

/// Multi-sample tool length probe
pub struct ProbeSampler {
    config: ProbeConfig,
    probe: ProbeHandle,
    motion: MotionHandle,
    suspension: Option<DetectorSuspension>,
    last_result: Option<f64>,
    last_samples: Vec<f64>,
}

impl ProbeSampler {
    pub fn new(config: ProbeConfig, probe: ProbeHandle, motion: MotionHandle) -> Self {
        tracing::info!(
            "Tool length probe at X{} Y{} Z{}",
            config.x,
            config.y,
            config.z
        );
        Self {
            config,
            probe,
            motion,
            suspension: None,
            last_result: None,
            last_samples: Vec::new(),
        }
    }

    /// Suspend the given detectors while a measurement runs
    pub fn with_suspension(mut self, suspension: DetectorSuspension) -> Self {
        self.suspension = Some(suspension);
        self
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Measure with the configured sample count
    pub fn probe_tool_length(&mut self) -> Result<ProbeMeasurement, MeasurementError> {
        self.probe_tool_length_with(None)
    }

    /// Measure, optionally overriding the sample count for this call only
    pub fn probe_tool_length_with(
        &mut self,
        samples: Option<usize>,
    ) -> Result<ProbeMeasurement, MeasurementError> {
        let count = samples.unwrap_or(self.config.samples);
        if count == 0 {
            return Err(MeasurementError::NoSamples);
        }

        let _suspended = self.suspension.as_ref().map(DetectorSuspension::suspend);
        let saved = SavedMotionState::save(self.motion.as_ref(), PROBE_STATE_NAME)?;

        let measurement = self.run_sequence(count)?;
        if let Err(e) = saved.restore() {
            tracing::error!("Measurement discarded, motion state not restored: {}", e);
            return Err(e.into());
        }

        self.last_result = Some(measurement.result);
        self.last_samples = measurement.samples.clone();
        tracing::info!(
            "Measured Z: {:.3}mm ({} samples, range {:.3}mm)",
            measurement.result,
            measurement.samples.len(),
            measurement.range
        );
        Ok(measurement)
    }

    fn run_sequence(&self, count: usize) -> Result<ProbeMeasurement, MeasurementError> {
        let cfg = &self.config;
        let motion = self.motion.as_ref();

        let here = motion.position();
        motion.move_to(here.with_z(cfg.safe_z()), cfg.lift_speed)?;
        motion.move_to(Position::new(cfg.x, cfg.y, cfg.safe_z()), cfg.lift_speed)?;
        motion.wait_until_idle()?;

        let samples = self.sample_z(count)?;

        let range = sample_range(&samples);
        if count > 1 && range > cfg.samples_tolerance {
            tracing::warn!(
                "Probe samples {:?} exceed tolerance {}mm",
                samples,
                cfg.samples_tolerance
            );
            return Err(MeasurementError::ToleranceExceeded {
                range,
                tolerance: cfg.samples_tolerance,
            });
        }

        let result = cfg
            .samples_result
            .aggregate(&samples)
            .ok_or(MeasurementError::NoSamples)?;

        let here = motion.position();
        motion.move_to(
            here.with_z(here.z + cfg.sample_retract_dist + FINAL_RETRACT_EXTRA),
            cfg.lift_speed,
        )?;

        Ok(ProbeMeasurement {
            result,
            samples,
            range,
        })
    }

    fn sample_z(&self, count: usize) -> Result<Vec<f64>, MeasurementError> {
        let cfg = &self.config;
        let motion = self.motion.as_ref();
        let target_z = cfg.target_z();

        let mut samples = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 {
                let here = motion.position();
                motion.move_to(here.with_z(here.z + cfg.sample_retract_dist), cfg.lift_speed)?;
                motion.wait_until_idle()?;
            }
            let z = self.probe.probe(target_z, cfg.speed)?;
            tracing::debug!("Probe sample {}/{}: Z={:.4}", i + 1, count, z);
            samples.push(z);
        }
        Ok(samples)
    }

    pub fn last_result(&self) -> Option<f64> {
        self.last_result
    }

    pub fn status(&self) -> ProbeStatus {
        ProbeStatus {
            last_result: self.last_result,
            last_samples: self.last_samples.clone(),
            x: self.config.x,
            y: self.config.y,
            z: self.config.z,
            samples: self.config.samples,
        }
    }
}

impl std::fmt::Debug for ProbeSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeSampler")
            .field("config", &self.config)
            .field("last_result", &self.last_result)
            .finish()
    }
}
