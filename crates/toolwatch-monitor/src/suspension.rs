//! Detector suspension during intentional motion.
//!
//! Probe sequences move the toolhead on purpose. While a [`SuspensionGuard`]
//! is alive the monitoring tick skips detector evaluation; every released
//! guard advances an epoch so the tick knows to re-prime its motion baseline.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct SuspensionState {
    depth: AtomicUsize,
    epoch: AtomicU64,
}

/// Shared handle; clones refer to the same suspension state
#[derive(Debug, Clone, Default)]
pub struct DetectorSuspension {
    state: Arc<SuspensionState>,
}

impl DetectorSuspension {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend detectors until the returned guard is dropped. Guards nest.
    pub fn suspend(&self) -> SuspensionGuard {
        self.state.depth.fetch_add(1, Ordering::SeqCst);
        SuspensionGuard {
            state: self.state.clone(),
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.state.depth.load(Ordering::SeqCst) > 0
    }

    /// Number of suspensions released so far
    pub fn epoch(&self) -> u64 {
        self.state.epoch.load(Ordering::SeqCst)
    }
}

/// Keeps detectors suspended while alive
#[derive(Debug)]
pub struct SuspensionGuard {
    state: Arc<SuspensionState>,
}

impl Drop for SuspensionGuard {
    fn drop(&mut self) {
        self.state.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.depth.fetch_sub(1, Ordering::SeqCst);
    }
}
