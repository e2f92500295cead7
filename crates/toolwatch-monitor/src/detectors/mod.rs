//! Detectors evaluated on every monitoring tick.
//!
//! Each detector owns its latch and whatever history it needs. Detectors
//! only report triggers; the monitor decides what happens next.

mod breakage;
mod collision;
mod probe_wear;
mod usage_wear;

pub use breakage::{BreakDetector, BreakTrigger};
pub use collision::{CollisionDetector, CollisionTrigger};
pub use probe_wear::{ProbeWearDetector, ProbeWearTrigger};
pub use usage_wear::{UsageWearDetector, WearFindings};
