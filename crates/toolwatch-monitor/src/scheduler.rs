//! Periodic monitoring loop
//!
//! Spawns a tokio task that ticks the [`ToolMonitor`] and re-arms itself
//! every `wear_check_interval`, or after a short retry delay when the tick
//! found the monitor busy. Stopping only signals the task not to re-arm;
//! an in-flight tick always runs to completion.

use crate::monitor::{SkipReason, ToolMonitor};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delay before retrying a tick that found the monitor busy
const BUSY_RETRY: Duration = Duration::from_millis(250);

/// Owns the tokio task driving a [`ToolMonitor`]
pub struct MonitoringLoop {
    monitor: Arc<ToolMonitor>,
    /// Loop task handle
    task: Arc<RwLock<Option<JoinHandle<()>>>>,
    /// Shutdown signal
    shutdown_signal: Arc<RwLock<Option<mpsc::Sender<()>>>>,
}

impl MonitoringLoop {
    pub fn new(monitor: Arc<ToolMonitor>) -> Self {
        Self {
            monitor,
            task: Arc::new(RwLock::new(None)),
            shutdown_signal: Arc::new(RwLock::new(None)),
        }
    }

    pub fn monitor(&self) -> &Arc<ToolMonitor> {
        &self.monitor
    }

    /// Whether the loop task is alive
    pub fn is_running(&self) -> bool {
        self.task
            .read()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Arm monitoring and spawn the loop. Must be called inside a tokio runtime.
    ///
    /// Starting a running loop only re-arms the monitor (resetting the
    /// collision and break latches).
    pub fn start(&self) {
        self.monitor.start_monitoring();
        if self.is_running() {
            tracing::debug!("Monitoring loop already running");
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_signal.write() = Some(shutdown_tx);

        let monitor = self.monitor.clone();
        let handle = tokio::spawn(async move {
            loop {
                // Check for shutdown
                if shutdown_rx.try_recv().is_ok() || !monitor.is_active() {
                    break;
                }

                let report = monitor.tick();
                if report.has_triggers() {
                    tracing::debug!("Monitoring tick {}: {:?}", report.tick, report);
                }

                let mut interval = monitor.check_interval();
                if report.skipped == Some(SkipReason::Busy) {
                    interval = interval.min(BUSY_RETRY);
                }
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown_rx.recv() => break,
                }
            }
            tracing::debug!("Monitoring loop exited");
        });

        *self.task.write() = Some(handle);
        tracing::info!(
            "Monitoring loop started (interval {:.1}s)",
            self.monitor.check_interval().as_secs_f64()
        );
    }

    /// Disarm monitoring and wait for the loop task to exit
    pub async fn stop(&self) {
        self.monitor.stop_monitoring();

        let shutdown = self.shutdown_signal.write().take();
        if let Some(tx) = shutdown {
            let _ = tx.send(()).await;
        }

        let handle = self.task.write().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Monitoring loop task failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for MonitoringLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringLoop")
            .field("running", &self.is_running())
            .field("monitor", &self.monitor)
            .finish()
    }
}
