use crate::common::rig;
use std::sync::Arc;
use std::time::Duration;
use toolwatch_core::Position;
use toolwatch_monitor::{MonitoringConfig, MonitoringLoop};

fn fast_config() -> MonitoringConfig {
    MonitoringConfig {
        wear_check_interval: 0.01,
        collision_acceleration_threshold: 100.0,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_loop_ticks_until_stopped() {
    let rig = rig(fast_config(), None);
    let monitor = Arc::new(rig.monitor);
    let monitoring = MonitoringLoop::new(monitor.clone());

    monitoring.start();
    monitoring.start();
    assert!(monitoring.is_running());
    assert!(monitor.is_active());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(monitor.status().tick_count > 0);

    monitoring.stop().await;
    assert!(!monitoring.is_running());
    assert!(!monitor.is_active());

    let ticks = monitor.status().tick_count;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(monitor.status().tick_count, ticks);
}

#[tokio::test]
async fn test_loop_detects_collision() {
    let rig = rig(fast_config(), None);
    let machine = rig.machine.clone();
    let monitor = Arc::new(rig.monitor);
    let monitoring = MonitoringLoop::new(monitor.clone());

    monitoring.start();
    tokio::time::sleep(Duration::from_millis(30)).await;
    machine.set_position(Position::new(0.0, 0.0, -500.0));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(monitor.status().collision_detected);
    assert_eq!(machine.pause_count(), 1);
    monitoring.stop().await;
}

#[tokio::test]
async fn test_stop_without_start() {
    let rig = rig(fast_config(), None);
    let monitoring = MonitoringLoop::new(Arc::new(rig.monitor));
    monitoring.stop().await;
    assert!(!monitoring.is_running());
}
