//! # Toolwatch
//!
//! CNC tool lifecycle and safety monitoring:
//! - Persisted tool registry with a usage-derived wear model
//! - Multi-sample, tolerance-checked tool length probing
//! - Collision, tool break and wear detection on a periodic loop
//! - Pause / emergency stop policy on detection
//!
//! ## Architecture
//!
//! Toolwatch is organized as a workspace with multiple crates:
//!
//! 1. **toolwatch-core** - Tool data model, wear model, registry, machine traits, events
//! 2. **toolwatch-monitor** - Detectors, action policy, probe sampler, monitoring loop
//! 3. **toolwatch-settings** - Configuration files (JSON/TOML) and validation
//! 4. **toolwatch** - Host binary wiring the crates to a machine

pub use toolwatch_core::data;
pub use toolwatch_monitor::{detectors, probe};

pub use toolwatch_core::{
    thread_safe, Error, EventBus, EventFilter, LoadMode, MachineError, MeasurementError,
    PersistenceError, Position, ProbeMeasurementHistory, RegistryError, RegistryStatus, Result,
    SharedRegistry, SpindleStatus, Tool, ToolRegistry, ToolType, ToolUpdate, ToolwatchEvent,
    WearAnalysis,
};

pub use toolwatch_monitor::{
    MonitorAction, MonitoringConfig, MonitoringLoop, MonitoringParams, MonitoringStatus,
    ProbeConfig, SampleAggregation, SimulatedMachine, TickReport, ToolLengthMeasurement,
    ToolMonitor,
};

pub use toolwatch_settings::{default_config_path, Config, RegistrySettings, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
/// - Targets, thread ids and line numbers
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
