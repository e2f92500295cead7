use crate::latch::Latch;
use serde::{Deserialize, Serialize};
use toolwatch_core::SpindleStatus;

/// A tool break latched on this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakTrigger {
    /// Observed current divided by the baseline
    pub current_ratio: f64,
}

/// Flags a sudden drop of spindle load current against the calibrated baseline.
///
/// A broken tool stops cutting, so the spindle draws less current.
#[derive(Debug, Clone, Default)]
pub struct BreakDetector {
    latch: Latch,
    last_current: Option<f64>,
}

impl BreakDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one telemetry sample. Only a running spindle is evaluated;
    /// a sample without a current reading counts as nominal.
    pub fn evaluate(
        &mut self,
        spindle: &SpindleStatus,
        baseline_current: f64,
        threshold: f64,
    ) -> Option<BreakTrigger> {
        if !spindle.is_running() {
            return None;
        }

        let current = spindle.current.unwrap_or(baseline_current);
        self.last_current = Some(current);
        if baseline_current <= 0.0 {
            return None;
        }

        let current_ratio = current / baseline_current;
        if current_ratio < threshold && self.latch.trigger() {
            tracing::error!("Tool break detected! Current ratio: {:.2}", current_ratio);
            return Some(BreakTrigger { current_ratio });
        }
        None
    }

    pub fn last_current(&self) -> Option<f64> {
        self.last_current
    }

    pub fn is_triggered(&self) -> bool {
        self.latch.is_triggered()
    }

    pub fn reset(&mut self) {
        self.latch.reset();
    }
}
