//! Tool monitor
//!
//! Owns the detector state, the action policy and the injected machine
//! collaborators. [`ToolMonitor::tick`] runs one evaluation pass; the
//! periodic scheduling lives in [`crate::scheduler`].
//!
//! Locking: the detector state is taken first, then the registry or the
//! measurement history. A probe measurement holds only the sampler lock
//! while the machine moves, so ticks keep running (or skip while suspended).

use crate::config::{MonitoringConfig, MonitoringParams};
use crate::detectors::{
    BreakDetector, BreakTrigger, CollisionDetector, CollisionTrigger, ProbeWearDetector,
    ProbeWearTrigger, UsageWearDetector,
};
use crate::policy::{ActionPolicy, MonitorAction};
use crate::probe::{ProbeConfig, ProbeMeasurement, ProbeSampler, ProbeStatus};
use crate::suspension::DetectorSuspension;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use toolwatch_core::types::{
    EmergencyStopHandle, MotionHandle, PauseHandle, PositionHandle, ProbeHandle, SpindleHandle,
};
use toolwatch_core::{
    Error, EventBus, MeasurementError, MeasurementEvent, MonitoringEvent, ProbeMeasurementHistory,
    RegistryError, Result, SharedRegistry, SpindleStatus, Tool, ToolwatchEvent, WearAnalysis,
};

/// How long a tick waits for the monitor state before skipping
const BUSY_WAIT: Duration = Duration::from_millis(50);

/// Why a tick did not evaluate the detectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Monitoring is stopped
    Inactive,
    /// A probe sequence is moving the machine
    Suspended,
    /// A command holds the monitor
    Busy,
}

/// Outcome of one monitoring tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick counter after this tick; unchanged for skipped ticks
    pub tick: u64,
    pub skipped: Option<SkipReason>,
    pub collision: Option<CollisionTrigger>,
    pub breakage: Option<BreakTrigger>,
    /// Tool whose wear alert latched on this tick
    pub wear_alert: Option<u32>,
    /// Tool reported as needing replacement on this tick
    pub replacement_required: Option<u32>,
    pub probe_wear: Option<ProbeWearTrigger>,
    pub actions: Vec<MonitorAction>,
}

impl TickReport {
    fn skipped(tick: u64, reason: SkipReason) -> Self {
        Self {
            tick,
            skipped: Some(reason),
            ..Default::default()
        }
    }

    /// Whether any detector fired
    pub fn has_triggers(&self) -> bool {
        self.collision.is_some()
            || self.breakage.is_some()
            || self.wear_alert.is_some()
            || self.replacement_required.is_some()
            || self.probe_wear.is_some()
    }
}

/// Read-only monitoring snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringStatus {
    pub monitoring_active: bool,
    pub collision_detected: bool,
    pub break_detected: bool,
    pub wear_alert: bool,
    pub collision_count: u32,
    pub baseline_current: f64,
    /// Last observed spindle current, if the spindle has reported one
    pub current_current: Option<f64>,
    pub collision_detection: bool,
    pub break_detection: bool,
    pub wear_monitoring: bool,
    pub probe_wear_detection: bool,
    pub suspended: bool,
    pub tick_count: u64,
    /// When the detectors last ran
    pub last_tick_at: Option<DateTime<Utc>>,
    pub job_count: u64,
    pub collision_threshold: f64,
    pub break_threshold: f64,
    pub wear_check_interval: f64,
}

/// Result of a tool length measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolLengthMeasurement {
    pub tool_id: u32,
    pub length: f64,
    pub samples: Vec<f64>,
    /// Whether the length was appended to the measurement history
    pub stored: bool,
    /// Number of measurements recorded for the tool
    pub measurement_count: usize,
    /// Wear against the reference length, once there are two measurements
    pub analysis: Option<WearAnalysis>,
}

/// Detector families actually running: enabled in config and backed by a collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Features {
    collision: bool,
    breakage: bool,
    usage_wear: bool,
    probe_wear: bool,
}

#[derive(Debug)]
struct MonitorState {
    config: MonitoringConfig,
    collision: CollisionDetector,
    breakage: BreakDetector,
    usage_wear: UsageWearDetector,
    baseline_current: f64,
    last_spindle: Option<SpindleStatus>,
    /// Suspension epoch the collision baseline belongs to
    seen_epoch: u64,
    tick_count: u64,
    last_tick_at: Option<DateTime<Utc>>,
    job_count: u64,
}

/// Builder resolving the optional collaborators once
pub struct ToolMonitorBuilder {
    config: MonitoringConfig,
    events: Arc<EventBus>,
    registry: Option<SharedRegistry>,
    position: Option<PositionHandle>,
    spindle: Option<SpindleHandle>,
    probe: Option<(ProbeConfig, ProbeHandle, MotionHandle)>,
    pause: Option<PauseHandle>,
    emergency_stop: Option<EmergencyStopHandle>,
}

impl ToolMonitorBuilder {
    pub fn registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn position_source(mut self, position: PositionHandle) -> Self {
        self.position = Some(position);
        self
    }

    pub fn spindle(mut self, spindle: SpindleHandle) -> Self {
        self.spindle = Some(spindle);
        self
    }

    /// Tool length probe and the motion controller that drives it
    pub fn probe(mut self, config: ProbeConfig, probe: ProbeHandle, motion: MotionHandle) -> Self {
        self.probe = Some((config, probe, motion));
        self
    }

    pub fn pause_control(mut self, pause: PauseHandle) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn emergency_stop(mut self, emergency_stop: EmergencyStopHandle) -> Self {
        self.emergency_stop = Some(emergency_stop);
        self
    }

    pub fn build(self) -> Result<ToolMonitor> {
        self.config.validate()?;

        let suspension = DetectorSuspension::new();
        let sampler = match self.probe {
            Some((probe_config, probe, motion)) => {
                probe_config.validate().map_err(Error::other)?;
                let sampler = ProbeSampler::new(probe_config, probe, motion);
                Some(if self.config.suspend_during_probe {
                    sampler.with_suspension(suspension.clone())
                } else {
                    sampler
                })
            }
            None => None,
        };

        let cfg = &self.config;
        let features = Features {
            collision: resolve(
                cfg.enable_collision_detection,
                self.position.is_some(),
                "Collision detection",
                "position source",
            ),
            breakage: resolve(
                cfg.enable_break_detection,
                self.spindle.is_some(),
                "Break detection",
                "spindle telemetry",
            ),
            usage_wear: resolve(
                cfg.enable_wear_monitoring,
                self.registry.is_some(),
                "Wear monitoring",
                "tool registry",
            ),
            probe_wear: resolve(
                cfg.enable_probe_wear_detection,
                sampler.is_some() && self.registry.is_some(),
                "Probe wear detection",
                "tool length probe and tool registry",
            ),
        };

        let policy = ActionPolicy::new(self.pause, self.emergency_stop, self.events.clone());
        for (action, trigger) in [
            (cfg.action_on_collision, "collision"),
            (cfg.action_on_break, "break"),
        ] {
            let available = match action {
                MonitorAction::Pause => policy.can_pause(),
                MonitorAction::Stop => policy.can_stop(),
                MonitorAction::Continue => true,
            };
            if !available {
                tracing::warn!(
                    "Action '{}' on {} has no collaborator and will only be logged",
                    action,
                    trigger
                );
            }
        }

        tracing::info!(
            "Tool monitor ready (collision: {}, break: {}, wear: {}, probe wear: {})",
            features.collision,
            features.breakage,
            features.usage_wear,
            features.probe_wear
        );

        Ok(ToolMonitor {
            state: Mutex::new(MonitorState {
                config: self.config,
                collision: CollisionDetector::new(),
                breakage: BreakDetector::new(),
                usage_wear: UsageWearDetector::new(),
                baseline_current: 0.0,
                last_spindle: None,
                seen_epoch: suspension.epoch(),
                tick_count: 0,
                last_tick_at: None,
                job_count: 0,
            }),
            active: AtomicBool::new(false),
            features,
            registry: self.registry,
            position: self.position,
            spindle: self.spindle,
            sampler: sampler.map(Mutex::new),
            history: Mutex::new(ProbeMeasurementHistory::new()),
            suspension,
            policy,
            events: self.events,
        })
    }
}

fn resolve(enabled: bool, available: bool, feature: &str, collaborator: &str) -> bool {
    if enabled && !available {
        tracing::warn!("{} disabled: no {} configured", feature, collaborator);
    }
    enabled && available
}

/// Collision, break and wear monitor for the current tool
pub struct ToolMonitor {
    state: Mutex<MonitorState>,
    active: AtomicBool,
    features: Features,
    registry: Option<SharedRegistry>,
    position: Option<PositionHandle>,
    spindle: Option<SpindleHandle>,
    sampler: Option<Mutex<ProbeSampler>>,
    history: Mutex<ProbeMeasurementHistory>,
    suspension: DetectorSuspension,
    policy: ActionPolicy,
    events: Arc<EventBus>,
}

impl ToolMonitor {
    pub fn builder(config: MonitoringConfig, events: Arc<EventBus>) -> ToolMonitorBuilder {
        ToolMonitorBuilder {
            config,
            events,
            registry: None,
            position: None,
            spindle: None,
            probe: None,
            pause: None,
            emergency_stop: None,
        }
    }

    fn emit(&self, event: MonitoringEvent) {
        self.events.emit(ToolwatchEvent::Monitoring(event));
    }

    fn registry(&self) -> Result<&SharedRegistry> {
        self.registry
            .as_ref()
            .ok_or_else(|| Error::missing("tool registry"))
    }

    fn sampler(&self) -> Result<&Mutex<ProbeSampler>> {
        self.sampler
            .as_ref()
            .ok_or_else(|| Error::missing("tool length probe"))
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Arm monitoring. Clears the collision and break latches and primes
    /// the motion baseline; calling it while armed only does the reset.
    pub fn start_monitoring(&self) {
        let mut state = self.state.lock();
        state.collision.reset();
        state.breakage.reset();
        match (&self.position, self.features.collision) {
            (Some(source), true) => state.collision.prime(&source.position()),
            _ => state.collision.clear_baseline(),
        }
        state.seen_epoch = self.suspension.epoch();
        drop(state);

        if self.active.swap(true, Ordering::SeqCst) {
            tracing::debug!("Tool monitoring already active, latches reset");
            return;
        }
        tracing::info!("Tool monitoring started");
        self.emit(MonitoringEvent::Started);
    }

    /// Disarm monitoring. Latches keep their state.
    pub fn stop_monitoring(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            tracing::info!("Tool monitoring stopped");
            self.emit(MonitoringEvent::Stopped);
        }
    }

    /// Run one evaluation pass. Waits at most 50 ms for a busy monitor,
    /// then skips with [`SkipReason::Busy`].
    pub fn tick(&self) -> TickReport {
        let Some(mut state) = self.state.try_lock_for(BUSY_WAIT) else {
            tracing::debug!("Monitor busy, tick skipped");
            return TickReport::skipped(0, SkipReason::Busy);
        };
        if !self.is_active() {
            return TickReport::skipped(state.tick_count, SkipReason::Inactive);
        }
        if self.suspension.is_suspended() {
            tracing::debug!("Detectors suspended, tick skipped");
            return TickReport::skipped(state.tick_count, SkipReason::Suspended);
        }

        let epoch = self.suspension.epoch();
        if epoch != state.seen_epoch {
            state.seen_epoch = epoch;
            state.collision.clear_baseline();
        }

        state.tick_count += 1;
        state.last_tick_at = Some(Utc::now());
        let mut report = TickReport {
            tick: state.tick_count,
            ..Default::default()
        };

        if self.features.collision {
            self.check_collision(&mut state, &mut report);
        }
        if let Some(spindle) = &self.spindle {
            let status = spindle.status();
            state.last_spindle = Some(status);
            if self.features.breakage {
                self.check_break(&mut state, &status, &mut report);
            }
        }
        if self.features.usage_wear {
            self.check_usage_wear(&mut state, &mut report);
        }
        if self.features.probe_wear {
            self.check_probe_wear(&state, &mut report);
        }

        report
    }

    fn check_collision(&self, state: &mut MonitorState, report: &mut TickReport) {
        let Some(source) = &self.position else {
            return;
        };
        let position = source.position();
        let threshold = state.config.collision_acceleration_threshold;
        let Some(trigger) = state.collision.evaluate(&position, threshold) else {
            return;
        };

        self.emit(MonitoringEvent::CollisionDetected {
            acceleration: trigger.acceleration,
            count: trigger.count,
        });
        let action = state.config.action_on_collision;
        self.policy.execute(action, "collision detected");
        report.collision = Some(trigger);
        report.actions.push(action);
    }

    fn check_break(&self, state: &mut MonitorState, status: &SpindleStatus, report: &mut TickReport) {
        let baseline = state.baseline_current;
        let threshold = state.config.break_spindle_current_threshold;
        let Some(trigger) = state.breakage.evaluate(status, baseline, threshold) else {
            return;
        };

        let tool_id = self.registry.as_ref().and_then(|registry| {
            let mut registry = registry.lock();
            let tool_id = registry.current_id()?;
            match registry.deactivate(tool_id) {
                Ok(()) => Some(tool_id),
                Err(e) => {
                    tracing::error!("Failed to mark broken tool inactive: {}", e);
                    None
                }
            }
        });

        self.emit(MonitoringEvent::BreakDetected {
            current_ratio: trigger.current_ratio,
            tool_id,
        });
        let action = state.config.action_on_break;
        self.policy.execute(action, "tool break detected");
        report.breakage = Some(trigger);
        report.actions.push(action);
    }

    fn check_usage_wear(&self, state: &mut MonitorState, report: &mut TickReport) {
        let Some(registry) = &self.registry else {
            return;
        };
        let Some(tool) = registry.lock().current().cloned() else {
            return;
        };

        let findings = state.usage_wear.evaluate(&tool);
        if findings.alert {
            self.emit(MonitoringEvent::WearAlert {
                tool_id: tool.tool_id,
                wear_level: tool.wear_level,
            });
            report.wear_alert = Some(tool.tool_id);
        }
        if findings.replacement_required {
            self.emit(MonitoringEvent::ReplacementRequired {
                tool_id: tool.tool_id,
            });
            report.replacement_required = Some(tool.tool_id);
        }
    }

    fn check_probe_wear(&self, state: &MonitorState, report: &mut TickReport) {
        let Some(registry) = &self.registry else {
            return;
        };
        let cfg = &state.config;
        let detector = ProbeWearDetector::new(
            cfg.probe_wear_threshold,
            cfg.probe_wear_check_frequency,
            cfg.probe_max_wear,
        );
        if !detector.is_due(state.job_count) {
            return;
        }
        let Some(tool_id) = registry.lock().current_id() else {
            return;
        };
        let Some(trigger) = detector.evaluate(state.job_count, &self.history.lock(), tool_id)
        else {
            return;
        };

        match registry.lock().apply_probe_wear(tool_id, trigger.wear_percent) {
            Ok(wear_level) => tracing::info!("Tool {} wear level now {:.1}%", tool_id, wear_level),
            Err(e) => tracing::error!("Failed to apply probe wear to tool {}: {}", tool_id, e),
        }
        self.emit(MonitoringEvent::ProbeWearDetected {
            tool_id,
            wear_mm: trigger.wear_mm,
            wear_percent: trigger.wear_percent,
        });
        report.probe_wear = Some(trigger);
    }

    /// Take the current spindle reading as the break detection baseline.
    /// A reading without a current value calibrates to 1.0.
    pub fn calibrate_baseline(&self) -> Result<f64> {
        let spindle = self
            .spindle
            .as_ref()
            .ok_or_else(|| Error::missing("spindle telemetry"))?;
        let status = spindle.status();
        let current = status.current.unwrap_or(1.0);
        if current <= 0.0 {
            tracing::warn!(
                "Baseline current {:.2} is not positive; break detection stays idle",
                current
            );
        }

        let mut state = self.state.lock();
        state.baseline_current = current;
        state.last_spindle = Some(status);
        drop(state);

        tracing::info!("Baseline spindle current calibrated: {:.2}A", current);
        self.emit(MonitoringEvent::BaselineCalibrated { current });
        Ok(current)
    }

    /// Return every latch to idle
    pub fn reset_latches(&self) {
        let mut state = self.state.lock();
        state.collision.reset();
        state.breakage.reset();
        state.usage_wear.reset();
        drop(state);

        tracing::info!("Collision detection reset");
        self.emit(MonitoringEvent::LatchesReset);
    }

    /// Change thresholds at runtime. Rejects the whole change if any value is invalid.
    pub fn set_params(&self, params: MonitoringParams) -> Result<()> {
        if params.is_empty() {
            return Err(Error::other("No parameters to update"));
        }
        let mut state = self.state.lock();
        state.config.apply(&params)?;
        tracing::info!(
            "Monitoring parameters updated: collision {:.1}, break {:.2}, interval {:.1}s",
            state.config.collision_acceleration_threshold,
            state.config.break_spindle_current_threshold,
            state.config.wear_check_interval
        );
        Ok(())
    }

    /// Measure the length of `tool_id` (or the current tool) with the probe.
    ///
    /// With `store` set the result is appended to the tool's measurement history.
    pub fn measure_tool_length(
        &self,
        tool_id: Option<u32>,
        store: bool,
    ) -> Result<ToolLengthMeasurement> {
        let sampler = self.sampler()?;
        let registry = self.registry()?;

        let tool_id = {
            let registry = registry.lock();
            match tool_id {
                Some(id) => registry
                    .get(id)
                    .map(|t| t.tool_id)
                    .ok_or(RegistryError::ToolNotFound { tool_id: id })?,
                None => registry
                    .current()
                    .map(|t| t.tool_id)
                    .ok_or(RegistryError::NoToolSelected)?,
            }
        };

        tracing::info!("Starting tool length measurement for tool {}", tool_id);
        self.events
            .emit(ToolwatchEvent::Measurement(MeasurementEvent::Started {
                tool_id: Some(tool_id),
            }));

        let measurement = sampler
            .lock()
            .probe_tool_length()
            .inspect_err(|e| self.measurement_failed(e))?;

        let threshold = self.state.lock().config.probe_wear_threshold;
        let (measurement_count, analysis) = {
            let mut history = self.history.lock();
            if store {
                history.record(tool_id, measurement.result);
            }
            (history.count(tool_id), history.analyze(tool_id, threshold))
        };

        if store {
            tracing::info!(
                "Tool {} length measured: {:.3}mm (measurement #{})",
                tool_id,
                measurement.result,
                measurement_count
            );
        }
        if let Some(analysis) = &analysis {
            tracing::info!(
                "Tool {}: original {:.3}mm, wear {:.3}mm ({:.1}%)",
                tool_id,
                analysis.original,
                analysis.wear_mm,
                analysis.wear_percent_of_length
            );
        }

        self.events
            .emit(ToolwatchEvent::Measurement(MeasurementEvent::Completed {
                tool_id: store.then_some(tool_id),
                length: measurement.result,
                samples: measurement.samples.len(),
            }));

        Ok(ToolLengthMeasurement {
            tool_id,
            length: measurement.result,
            samples: measurement.samples,
            stored: store,
            measurement_count,
            analysis,
        })
    }

    fn measurement_failed(&self, error: &MeasurementError) {
        tracing::error!("Tool length measurement failed: {}", error);
        self.events
            .emit(ToolwatchEvent::Measurement(MeasurementEvent::Failed {
                reason: error.to_string(),
            }));
    }

    /// Raw probe measurement that is not attributed to any tool
    pub fn probe_tool_length(&self, samples: Option<usize>) -> Result<ProbeMeasurement> {
        let sampler = self.sampler()?;
        let measurement = sampler
            .lock()
            .probe_tool_length_with(samples)
            .inspect_err(|e| self.measurement_failed(e))?;
        Ok(measurement)
    }

    /// Length wear from the measurement history.
    ///
    /// With a tool id the tool must have at least two measurements; without
    /// one every tool that has two or more is analysed.
    pub fn check_tool_wear_probe(&self, tool_id: Option<u32>) -> Result<Vec<WearAnalysis>> {
        let threshold = self.state.lock().config.probe_wear_threshold;
        let history = self.history.lock();
        match tool_id {
            Some(tool_id) => {
                let analysis = history.analyze(tool_id, threshold).ok_or(
                    MeasurementError::InsufficientHistory {
                        tool_id,
                        count: history.count(tool_id),
                    },
                )?;
                Ok(vec![analysis])
            }
            None => Ok(history.analyze_all(threshold)),
        }
    }

    /// Measured lengths recorded for a tool, oldest first
    pub fn measurements(&self, tool_id: u32) -> Vec<f64> {
        self.history.lock().measurements(tool_id).to_vec()
    }

    /// Add runtime and distance to the current tool.
    ///
    /// Returns the updated tool, or `None` when no tool is selected.
    pub fn update_tool_usage(&self, runtime: f64, distance: f64) -> Result<Option<Tool>> {
        let registry = self.registry()?;
        let spindle_running = self
            .spindle
            .as_ref()
            .is_some_and(|spindle| spindle.status().is_running());
        Ok(registry
            .lock()
            .record_usage(runtime, distance, spindle_running)
            .cloned())
    }

    /// Count a finished job; returns the new job count
    pub fn record_job_completed(&self) -> u64 {
        let mut state = self.state.lock();
        state.job_count += 1;
        tracing::debug!("Job {} completed", state.job_count);
        state.job_count
    }

    pub fn status(&self) -> MonitoringStatus {
        let state = self.state.lock();
        MonitoringStatus {
            monitoring_active: self.is_active(),
            collision_detected: state.collision.is_triggered(),
            break_detected: state.breakage.is_triggered(),
            wear_alert: state.usage_wear.is_triggered(),
            collision_count: state.collision.count(),
            baseline_current: state.baseline_current,
            current_current: state.last_spindle.and_then(|s| s.current),
            collision_detection: self.features.collision,
            break_detection: self.features.breakage,
            wear_monitoring: self.features.usage_wear,
            probe_wear_detection: self.features.probe_wear,
            suspended: self.suspension.is_suspended(),
            tick_count: state.tick_count,
            last_tick_at: state.last_tick_at,
            job_count: state.job_count,
            collision_threshold: state.config.collision_acceleration_threshold,
            break_threshold: state.config.break_spindle_current_threshold,
            wear_check_interval: state.config.wear_check_interval,
        }
    }

    /// Probe snapshot, `None` without a probe
    pub fn probe_status(&self) -> Option<ProbeStatus> {
        self.sampler.as_ref().map(|sampler| sampler.lock().status())
    }

    /// Current tick period
    pub fn check_interval(&self) -> Duration {
        self.state.lock().config.check_interval()
    }

    pub fn config(&self) -> MonitoringConfig {
        self.state.lock().config.clone()
    }

    /// Suspension handle for other intentional motion sequences
    pub fn suspension(&self) -> &DetectorSuspension {
        &self.suspension
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }
}

impl std::fmt::Debug for ToolMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolMonitor")
            .field("active", &self.is_active())
            .field("features", &self.features)
            .field("policy", &self.policy)
            .field("probe", &self.sampler.is_some())
            .finish()
    }
}
