//! Type aliases for commonly used complex types.
//!
//! Gives short names to the shared-ownership types passed between the
//! registry, the monitor and the host.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolwatch_core::types::*;
//!
//! // Instead of: Arc<parking_lot::Mutex<ToolRegistry>>
//! let registry: SharedRegistry = thread_safe(ToolRegistry::in_memory(bus));
//!
//! // Instead of: Arc<dyn SpindleTelemetry>
//! let spindle: SpindleHandle = machine.clone();
//! ```

use crate::data::ToolRegistry;
use crate::machine::{
    EmergencyStop, MotionController, MotionProbe, PauseControl, PositionSource, SpindleTelemetry,
};
use parking_lot::Mutex;
use std::sync::Arc;

// =============================================================================
// THREAD-SAFE SHARED TYPES (Arc<Mutex<T>>)
// =============================================================================

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Uses `parking_lot::Mutex` for better performance than `std::sync::Mutex`.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// The tool registry shared between the monitor and the host.
///
/// All registry mutation is serialized through this one lock.
pub type SharedRegistry = ThreadSafe<ToolRegistry>;

// =============================================================================
// COLLABORATOR HANDLES (Arc<dyn T>)
// =============================================================================
// Collaborators are provided by the host at runtime, so they are trait objects.

pub type PositionHandle = Arc<dyn PositionSource>;
pub type SpindleHandle = Arc<dyn SpindleTelemetry>;
pub type ProbeHandle = Arc<dyn MotionProbe>;
pub type MotionHandle = Arc<dyn MotionController>;
pub type PauseHandle = Arc<dyn PauseControl>;
pub type EmergencyStopHandle = Arc<dyn EmergencyStop>;

// =============================================================================
// CONSTRUCTOR HELPERS
// =============================================================================

/// Create a new `ThreadSafe<T>` from a value.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}
