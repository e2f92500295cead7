use crate::common::rig;
use toolwatch_core::{Error, MeasurementError, MonitoringEvent, Position, ToolwatchEvent};
use toolwatch_monitor::{MonitorAction, MonitoringConfig, ProbeConfig};

fn collision_config() -> MonitoringConfig {
    MonitoringConfig {
        collision_acceleration_threshold: 100.0,
        ..Default::default()
    }
}

#[test]
fn test_collision_latch_fires_once_until_reset() {
    let rig = rig(collision_config(), None);
    rig.monitor.start_monitoring();

    assert!(rig.monitor.tick().collision.is_none());

    rig.machine.set_position(Position::new(0.0, 0.0, -500.0));
    let report = rig.monitor.tick();
    assert_eq!(report.collision.map(|c| c.count), Some(1));
    assert_eq!(report.actions, vec![MonitorAction::Pause]);

    // Larger spike while latched
    rig.machine.set_position(Position::new(0.0, 0.0, 0.0));
    assert!(rig.monitor.tick().collision.is_none());
    rig.machine.set_position(Position::new(0.0, 0.0, -500.0));
    assert!(rig.monitor.tick().collision.is_none());

    let status = rig.monitor.status();
    assert!(status.collision_detected);
    assert_eq!(status.collision_count, 1);
    assert_eq!(rig.machine.pause_count(), 1);

    rig.monitor.reset_latches();
    rig.machine.set_position(Position::new(0.0, 0.0, 0.0));
    let report = rig.monitor.tick();
    assert_eq!(report.collision.map(|c| c.count), Some(2));
    assert_eq!(rig.machine.pause_count(), 2);
    assert_eq!(
        rig.event_count(|e| matches!(
            e,
            ToolwatchEvent::Monitoring(MonitoringEvent::CollisionDetected { .. })
        )),
        2
    );
}

#[test]
fn test_start_clears_collision_latch() {
    let rig = rig(collision_config(), None);
    rig.monitor.start_monitoring();
    rig.machine.set_position(Position::new(300.0, 0.0, 0.0));
    assert!(rig.monitor.tick().collision.is_some());

    rig.monitor.start_monitoring();
    assert!(!rig.monitor.status().collision_detected);
    assert_eq!(rig.monitor.status().collision_count, 1);
}

#[test]
fn test_break_deactivates_tool_and_stops_once() {
    let rig = rig(MonitoringConfig::default(), None);
    rig.machine.set_spindle(12_000.0, Some(1.0));
    assert_eq!(rig.monitor.calibrate_baseline().unwrap(), 1.0);
    rig.monitor.start_monitoring();

    assert!(rig.monitor.tick().breakage.is_none());

    rig.machine.set_spindle(12_000.0, Some(0.3));
    let report = rig.monitor.tick();
    let trigger = report.breakage.unwrap();
    assert!((trigger.current_ratio - 0.3).abs() < 1e-9);
    assert_eq!(report.actions, vec![MonitorAction::Stop]);

    assert!(rig.monitor.tick().breakage.is_none());
    assert!(rig.monitor.tick().breakage.is_none());

    assert!(!rig.registry.lock().get(1).unwrap().is_active);
    assert_eq!(rig.machine.emergency_stop_count(), 1);
    assert_eq!(
        rig.event_count(|e| matches!(
            e,
            ToolwatchEvent::Monitoring(MonitoringEvent::BreakDetected {
                tool_id: Some(1),
                ..
            })
        )),
        1
    );

    let status = rig.monitor.status();
    assert!(status.break_detected);
    assert_eq!(status.current_current, Some(0.3));
}

#[test]
fn test_break_needs_running_spindle_and_baseline() {
    let rig = rig(MonitoringConfig::default(), None);
    rig.monitor.start_monitoring();

    // No calibration yet
    rig.machine.set_spindle(12_000.0, Some(0.1));
    assert!(rig.monitor.tick().breakage.is_none());

    rig.machine.set_spindle(12_000.0, Some(1.0));
    rig.monitor.calibrate_baseline().unwrap();
    rig.machine.set_spindle(0.0, Some(0.0));
    assert!(rig.monitor.tick().breakage.is_none());
    assert!(rig.registry.lock().get(1).unwrap().is_active);
}

#[test]
fn test_wear_alert_latches_and_replacement_repeats() {
    let rig = rig(MonitoringConfig::default(), None);
    rig.monitor.start_monitoring();

    rig.monitor.update_tool_usage(85.0, 0.0).unwrap();
    assert_eq!(rig.monitor.tick().wear_alert, Some(1));
    assert_eq!(rig.monitor.tick().wear_alert, None);
    assert!(rig.monitor.status().wear_alert);

    rig.monitor.update_tool_usage(15.0, 0.0).unwrap();
    for _ in 0..3 {
        let report = rig.monitor.tick();
        assert_eq!(report.replacement_required, Some(1));
        assert_eq!(report.wear_alert, None);
    }
    assert_eq!(
        rig.event_count(|e| matches!(
            e,
            ToolwatchEvent::Monitoring(MonitoringEvent::ReplacementRequired { tool_id: 1 })
        )),
        3
    );
}

#[test]
fn test_probe_wear_merges_on_job_checkpoint() {
    let config = MonitoringConfig {
        enable_probe_wear_detection: true,
        probe_wear_check_frequency: 2,
        ..Default::default()
    };
    let rig = rig(config, Some(ProbeConfig::default()));
    rig.monitor.start_monitoring();

    rig.machine.script_probe([50.0, 50.0, 50.0]);
    rig.monitor.measure_tool_length(None, true).unwrap();
    rig.machine.script_probe([49.0, 49.0, 49.0]);
    rig.monitor.measure_tool_length(None, true).unwrap();

    assert_eq!(rig.monitor.record_job_completed(), 1);
    assert!(rig.monitor.tick().probe_wear.is_none());

    assert_eq!(rig.monitor.record_job_completed(), 2);
    let trigger = rig.monitor.tick().probe_wear.unwrap();
    assert_eq!(trigger.tool_id, 1);
    assert_eq!(trigger.wear_mm, 1.0);
    assert_eq!(trigger.wear_percent, 50.0);
    assert_eq!(rig.registry.lock().get(1).unwrap().wear_level, 50.0);

    // Usage recompute drops wear to 10%; the checkpoint tick merges the probe estimate back
    rig.monitor.update_tool_usage(10.0, 0.0).unwrap();
    rig.monitor.tick();
    assert_eq!(rig.registry.lock().get(1).unwrap().wear_level, 50.0);
}

#[test]
fn test_check_tool_wear_probe() {
    let rig = rig(MonitoringConfig::default(), Some(ProbeConfig::default()));

    rig.machine.script_probe([50.0, 50.0, 50.0]);
    rig.monitor.measure_tool_length(Some(1), true).unwrap();

    let err = rig.monitor.check_tool_wear_probe(Some(1)).unwrap_err();
    assert!(matches!(
        err,
        Error::Measurement(MeasurementError::InsufficientHistory {
            tool_id: 1,
            count: 1
        })
    ));
    assert!(rig.monitor.check_tool_wear_probe(None).unwrap().is_empty());

    rig.machine.script_probe([49.0, 49.0, 49.0]);
    let measured = rig.monitor.measure_tool_length(Some(1), true).unwrap();
    assert_eq!(measured.measurement_count, 2);
    assert_eq!(measured.analysis.as_ref().map(|a| a.wear_mm), Some(1.0));

    let analyses = rig.monitor.check_tool_wear_probe(Some(1)).unwrap();
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].original, 50.0);
    assert_eq!(analyses[0].latest, 49.0);
    assert!((analyses[0].wear_percent_of_length - 2.0).abs() < 1e-9);
    assert!(analyses[0].exceeds_threshold);
}
