//! # Toolwatch Core
//!
//! Core types, traits, and utilities for Toolwatch.
//! Provides the tool data model, the wear model, the persisted tool registry,
//! the machine collaborator traits, and the event bus.

pub mod data;
pub mod error;
pub mod event_bus;
pub mod machine;
pub mod types;

pub use data::{
    ImportSummary, LoadMode, ProbeMeasurementHistory, RegistryStatus, Tool, ToolRegistry,
    ToolSummary, ToolType, ToolUpdate, WearAnalysis,
};

pub use error::{Error, MachineError, MeasurementError, PersistenceError, RegistryError, Result};

// Re-export event bus for convenience
pub use event_bus::{
    EventBus, EventCategory, EventFilter, JournalEntry, MeasurementEvent, MonitoringEvent,
    RegistryEvent, SubscriptionId, ToolwatchEvent,
};

pub use machine::{
    EmergencyStop, MotionController, MotionProbe, PauseControl, Position, PositionSource,
    SpindleStatus, SpindleTelemetry,
};

// Re-export type aliases for convenience
pub use types::{thread_safe, SharedRegistry, ThreadSafe};
