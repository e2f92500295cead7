//! Two-state latch used by the detectors.
//!
//! A latch moves from `Idle` to `Triggered` on the first breach and stays
//! there until explicitly reset, so a persistent condition fires once.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Latch {
    #[default]
    Idle,
    Triggered,
}

impl Latch {
    /// Move to `Triggered`. Returns true only on the Idle -> Triggered transition.
    pub fn trigger(&mut self) -> bool {
        match self {
            Latch::Idle => {
                *self = Latch::Triggered;
                true
            }
            Latch::Triggered => false,
        }
    }

    pub fn reset(&mut self) {
        *self = Latch::Idle;
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self, Latch::Triggered)
    }
}
