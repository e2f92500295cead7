//! # Toolwatch Monitor
//!
//! Live monitoring of the current tool: collision, break and wear
//! detection driven by a periodic loop, the action policy that reacts to
//! them, and the multi-sample tool length probe.

pub mod config;
pub mod detectors;
pub mod latch;
pub mod monitor;
pub mod policy;
pub mod probe;
pub mod scheduler;
pub mod sim;
pub mod suspension;

pub use config::{MonitoringConfig, MonitoringParams};
pub use latch::Latch;
pub use monitor::{
    MonitoringStatus, SkipReason, TickReport, ToolLengthMeasurement, ToolMonitor,
    ToolMonitorBuilder,
};
pub use policy::{ActionPolicy, MonitorAction};
pub use probe::{ProbeConfig, ProbeMeasurement, ProbeSampler, ProbeStatus, SampleAggregation};
pub use scheduler::MonitoringLoop;
pub use sim::SimulatedMachine;
pub use suspension::{DetectorSuspension, SuspensionGuard};
