use serde::{Deserialize, Serialize};
use toolwatch_core::data::wear;
use toolwatch_core::ProbeMeasurementHistory;

/// Length loss beyond the probe wear threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeWearTrigger {
    pub tool_id: u32,
    /// `first - latest` measured length, mm
    pub wear_mm: f64,
    /// Wear estimate to merge into the tool's wear level
    pub wear_percent: f64,
}

/// Compares a tool's latest measured length with its reference length
#[derive(Debug, Clone)]
pub struct ProbeWearDetector {
    threshold_mm: f64,
    check_frequency: u32,
    max_wear_mm: f64,
}

impl ProbeWearDetector {
    pub fn new(threshold_mm: f64, check_frequency: u32, max_wear_mm: f64) -> Self {
        Self {
            threshold_mm,
            check_frequency,
            max_wear_mm,
        }
    }

    /// Whether this job count is a checkpoint
    pub fn is_due(&self, job_count: u64) -> bool {
        self.check_frequency > 0 && job_count % u64::from(self.check_frequency) == 0
    }

    pub fn evaluate(
        &self,
        job_count: u64,
        history: &ProbeMeasurementHistory,
        tool_id: u32,
    ) -> Option<ProbeWearTrigger> {
        if !self.is_due(job_count) {
            return None;
        }

        let wear_mm = history.length_loss(tool_id)?;
        if wear_mm <= self.threshold_mm {
            return None;
        }

        let wear_percent = wear::probe_wear(wear_mm, self.max_wear_mm);
        tracing::warn!(
            "Probe wear detected: tool {} has worn {:.3}mm ({:.1}%)",
            tool_id,
            wear_mm,
            wear_percent
        );
        Some(ProbeWearTrigger {
            tool_id,
            wear_mm,
            wear_percent,
        })
    }
}
