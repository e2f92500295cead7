//! Probe measurement history
//!
//! Per-tool sequence of measured lengths. The first entry is the reference
//! length; wear is the difference between it and the latest entry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Length wear derived from a tool's measurement history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearAnalysis {
    pub tool_id: u32,
    /// First measured length (reference)
    pub original: f64,
    /// Most recent measured length
    pub latest: f64,
    /// `original - latest` in mm
    pub wear_mm: f64,
    /// Wear relative to the original length, in percent
    pub wear_percent_of_length: f64,
    /// All measurements, oldest first
    pub measurements: Vec<f64>,
    /// Whether `wear_mm` is above the probe wear threshold
    pub exceeds_threshold: bool,
}

/// Append-only measured lengths keyed by tool id
#[derive(Debug, Clone, Default)]
pub struct ProbeMeasurementHistory {
    entries: BTreeMap<u32, Vec<f64>>,
}

impl ProbeMeasurementHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a measured length for `tool_id`
    pub fn record(&mut self, tool_id: u32, length: f64) {
        self.entries.entry(tool_id).or_default().push(length);
    }

    /// All measurements for a tool, oldest first
    pub fn measurements(&self, tool_id: u32) -> &[f64] {
        self.entries.get(&tool_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Reference (first) length
    pub fn original(&self, tool_id: u32) -> Option<f64> {
        self.measurements(tool_id).first().copied()
    }

    /// `first - latest`, available once a tool has two measurements
    pub fn length_loss(&self, tool_id: u32) -> Option<f64> {
        match self.measurements(tool_id) {
            [first, .., latest] => Some(first - latest),
            _ => None,
        }
    }

    /// Wear analysis for one tool, `None` with fewer than two measurements
    pub fn analyze(&self, tool_id: u32, wear_threshold: f64) -> Option<WearAnalysis> {
        let measurements = self.measurements(tool_id);
        let (original, latest) = match measurements {
            [first, .., last] => (*first, *last),
            _ => return None,
        };
        let wear_mm = original - latest;
        let wear_percent_of_length = if original > 0.0 {
            wear_mm / original * 100.0
        } else {
            0.0
        };

        Some(WearAnalysis {
            tool_id,
            original,
            latest,
            wear_mm,
            wear_percent_of_length,
            measurements: measurements.to_vec(),
            exceeds_threshold: wear_mm > wear_threshold,
        })
    }

    /// Analyses for every tool with at least two measurements, by tool id
    pub fn analyze_all(&self, wear_threshold: f64) -> Vec<WearAnalysis> {
        self.entries
            .keys()
            .filter_map(|&id| self.analyze(id, wear_threshold))
            .collect()
    }

    /// Number of measurements recorded for a tool
    pub fn count(&self, tool_id: u32) -> usize {
        self.measurements(tool_id).len()
    }
}
