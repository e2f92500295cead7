use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use toolwatch::{
    default_config_path, init_logging, thread_safe, Config, EventBus, EventFilter,
    MonitoringLoop, SimulatedMachine, ToolMonitor, ToolRegistry, BUILD_DATE, VERSION,
};

/// Seconds between status snapshots in the log
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    tracing::info!("Toolwatch {} (built {})", VERSION, BUILD_DATE);

    let config_path = std::env::var_os("TOOLWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let events = Arc::new(EventBus::new());
    events.subscribe(EventFilter::Warnings, |event| {
        tracing::warn!("{}", event.description());
    });

    let registry = ToolRegistry::load(
        config.registry.database_path(),
        config.registry.load_mode(),
        events.clone(),
    )
    .context("opening tool database")?;
    tracing::info!(
        "Tool database {} ({} tools)",
        config.registry.database_path().display(),
        registry.len()
    );
    let registry = thread_safe(registry);

    // No hardware backend is wired in yet; run against the simulator
    let machine = Arc::new(SimulatedMachine::new());
    let mut builder = ToolMonitor::builder(config.monitoring.clone(), events.clone())
        .registry(registry.clone())
        .position_source(machine.clone())
        .spindle(machine.clone())
        .pause_control(machine.clone())
        .emergency_stop(machine.clone());
    if let Some(probe) = config.probe.clone() {
        builder = builder.probe(probe, machine.clone(), machine.clone());
    }
    let monitor = Arc::new(builder.build()?);

    let monitoring = MonitoringLoop::new(monitor.clone());
    monitoring.start();

    let mut status_timer = tokio::time::interval(STATUS_INTERVAL);
    loop {
        tokio::select! {
            _ = status_timer.tick() => {
                let status = registry.lock().status();
                let current = status
                    .current_tool
                    .map(|t| format!("T{} '{}' {:.1}%", t.id, t.name, t.wear_level))
                    .unwrap_or_else(|| "none".to_string());
                tracing::info!("Tools: {}, current: {}", status.tool_count, current);
                if let Some(entry) = events.last_warning() {
                    tracing::info!(
                        "Last warning at {}: {}",
                        entry.at.format("%H:%M:%S"),
                        entry.event.description()
                    );
                }
                tracing::debug!("{}", serde_json::to_string(&monitor.status())?);
            }
            result = tokio::signal::ctrl_c() => {
                result.context("waiting for Ctrl-C")?;
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    monitoring.stop().await;

    let mut registry = registry.lock();
    if registry.has_unsaved_changes() {
        if let Err(e) = registry.save() {
            tracing::error!("Tool database not saved: {}", e);
        }
    }

    Ok(())
}
