//! Simulated machine
//!
//! In-memory implementation of every machine collaborator. Used by the
//! host binary when no hardware is attached and by tests to script probe
//! readings, position samples and spindle telemetry.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use toolwatch_core::{
    EmergencyStop, MachineError, MotionController, MotionProbe, PauseControl, Position,
    PositionSource, SpindleStatus, SpindleTelemetry,
};

/// A move the simulated controller executed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedMove {
    pub target: Position,
    pub speed: f64,
}

#[derive(Debug)]
struct SimState {
    position: Position,
    spindle: SpindleStatus,
    /// Height at which the probe triggers when nothing is scripted
    surface_z: Option<f64>,
    scripted_probes: VecDeque<Result<f64, MachineError>>,
    moves: Vec<SimulatedMove>,
    saved_states: HashMap<String, Position>,
    /// Controller rejects every restore
    restore_fails: bool,
    restore_attempts: usize,
    restore_count: usize,
    pause_count: usize,
    emergency_stop_count: usize,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            position: Position::default(),
            spindle: SpindleStatus::default(),
            surface_z: Some(0.0),
            scripted_probes: VecDeque::new(),
            moves: Vec::new(),
            saved_states: HashMap::new(),
            restore_fails: false,
            restore_attempts: 0,
            restore_count: 0,
            pause_count: 0,
            emergency_stop_count: 0,
        }
    }
}

/// Simulated machine implementing all collaborator traits
#[derive(Debug, Default)]
pub struct SimulatedMachine {
    state: Mutex<SimState>,
}

impl SimulatedMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&self, position: Position) {
        self.state.lock().position = position;
    }

    pub fn set_spindle(&self, speed: f64, current: Option<f64>) {
        self.state.lock().spindle = SpindleStatus { speed, current };
    }

    /// Height the probe triggers at once scripted readings run out.
    /// `None` makes every unscripted probe miss.
    pub fn set_probe_surface(&self, surface_z: Option<f64>) {
        self.state.lock().surface_z = surface_z;
    }

    /// Queue probe readings returned in order by the next probe moves
    pub fn script_probe(&self, readings: impl IntoIterator<Item = f64>) {
        self.state
            .lock()
            .scripted_probes
            .extend(readings.into_iter().map(Ok));
    }

    /// Queue a probe failure
    pub fn script_probe_error(&self, error: MachineError) {
        self.state.lock().scripted_probes.push_back(Err(error));
    }

    pub fn moves(&self) -> Vec<SimulatedMove> {
        self.state.lock().moves.clone()
    }

    /// Motion states saved and not yet restored
    pub fn pending_saved_states(&self) -> usize {
        self.state.lock().saved_states.len()
    }

    /// Make every following `restore_state` fail
    pub fn set_restore_failure(&self, fails: bool) {
        self.state.lock().restore_fails = fails;
    }

    /// Restores requested, successful or not
    pub fn restore_attempts(&self) -> usize {
        self.state.lock().restore_attempts
    }

    /// Restores that succeeded
    pub fn restore_count(&self) -> usize {
        self.state.lock().restore_count
    }

    pub fn pause_count(&self) -> usize {
        self.state.lock().pause_count
    }

    pub fn emergency_stop_count(&self) -> usize {
        self.state.lock().emergency_stop_count
    }
}

impl PositionSource for SimulatedMachine {
    fn position(&self) -> Position {
        self.state.lock().position
    }
}

impl SpindleTelemetry for SimulatedMachine {
    fn status(&self) -> SpindleStatus {
        self.state.lock().spindle
    }
}

impl MotionProbe for SimulatedMachine {
    fn probe(&self, target_z: f64, _speed: f64) -> Result<f64, MachineError> {
        let mut state = self.state.lock();
        let reading = match state.scripted_probes.pop_front() {
            Some(reading) => reading,
            None => match state.surface_z {
                Some(z) if z >= target_z => Ok(z),
                _ => Err(MachineError::ProbeSurfaceNotFound { target_z }),
            },
        };

        match reading {
            Ok(z) => {
                state.position.z = z;
                Ok(z)
            }
            Err(e) => {
                state.position.z = target_z;
                Err(e)
            }
        }
    }
}

impl MotionController for SimulatedMachine {
    fn move_to(&self, position: Position, speed: f64) -> Result<(), MachineError> {
        if speed.is_nan() || speed <= 0.0 {
            return Err(MachineError::MotionFailed {
                reason: format!("invalid speed {}", speed),
            });
        }
        let mut state = self.state.lock();
        state.moves.push(SimulatedMove {
            target: position,
            speed,
        });
        state.position = position;
        Ok(())
    }

    fn wait_until_idle(&self) -> Result<(), MachineError> {
        Ok(())
    }

    fn save_state(&self, name: &str) -> Result<(), MachineError> {
        let mut state = self.state.lock();
        let position = state.position;
        state.saved_states.insert(name.to_string(), position);
        Ok(())
    }

    fn restore_state(&self, name: &str) -> Result<(), MachineError> {
        let mut state = self.state.lock();
        state.restore_attempts += 1;
        if state.restore_fails {
            return Err(MachineError::StateRestoreFailed {
                name: name.to_string(),
                reason: "controller rejected the restore".to_string(),
            });
        }
        if state.saved_states.remove(name).is_none() {
            return Err(MachineError::StateRestoreFailed {
                name: name.to_string(),
                reason: "state was never saved".to_string(),
            });
        }
        state.restore_count += 1;
        Ok(())
    }

    fn position(&self) -> Position {
        self.state.lock().position
    }
}

impl PauseControl for SimulatedMachine {
    fn pause(&self) {
        self.state.lock().pause_count += 1;
        tracing::info!("Simulated machine paused");
    }
}

impl EmergencyStop for SimulatedMachine {
    fn trigger(&self) {
        self.state.lock().emergency_stop_count += 1;
        tracing::info!("Simulated machine emergency stop");
    }
}
