//! Data models for the tool lifecycle
//!
//! This module provides:
//! - Tool records and partial updates
//! - The wear model
//! - The tool registry and its on-disk format
//! - Probe measurement history

pub mod history;
pub mod persistence;
pub mod registry;
pub mod tools;
pub mod wear;

pub use history::{ProbeMeasurementHistory, WearAnalysis};
pub use persistence::{ExportFile, ToolDatabaseFile, DATABASE_VERSION};
pub use registry::{ImportSummary, LoadMode, RegistryStatus, ToolRegistry};
pub use tools::{Tool, ToolSummary, ToolType, ToolUpdate};
