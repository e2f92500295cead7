use crate::common::rig;
use std::sync::Arc;
use toolwatch_core::{
    Error, MachineError, MeasurementError, MeasurementEvent, Position, RegistryError,
    ToolwatchEvent,
};
use toolwatch_monitor::probe::PROBE_STATE_NAME;
use toolwatch_monitor::{
    MonitoringConfig, ProbeConfig, ProbeSampler, SampleAggregation, SimulatedMachine,
};

fn probe_config(aggregation: SampleAggregation) -> ProbeConfig {
    ProbeConfig {
        samples_tolerance: 0.02,
        samples_result: aggregation,
        ..ProbeConfig::at(100.0, 50.0, 0.0)
    }
}

fn sampler(machine: &Arc<SimulatedMachine>, config: ProbeConfig) -> ProbeSampler {
    ProbeSampler::new(config, machine.clone(), machine.clone())
}

#[test]
fn test_samples_within_tolerance_average() {
    let machine = Arc::new(SimulatedMachine::new());
    machine.script_probe([10.00, 10.00, 10.01]);
    let mut sampler = sampler(&machine, probe_config(SampleAggregation::Average));

    let measurement = sampler.probe_tool_length().unwrap();
    assert!((measurement.result - 10.003_333).abs() < 1e-5);
    assert_eq!(measurement.samples, vec![10.00, 10.00, 10.01]);
    assert_eq!(sampler.last_result(), Some(measurement.result));
    assert_eq!(machine.restore_count(), 1);
    assert_eq!(machine.pending_saved_states(), 0);
}

#[test]
fn test_samples_within_tolerance_median() {
    let machine = Arc::new(SimulatedMachine::new());
    machine.script_probe([10.00, 10.00, 10.01]);
    let mut sampler = sampler(&machine, probe_config(SampleAggregation::Median));

    assert_eq!(sampler.probe_tool_length().unwrap().result, 10.00);
}

#[test]
fn test_tolerance_exceeded_records_nothing() {
    let machine = Arc::new(SimulatedMachine::new());
    machine.script_probe([10.00, 10.05, 9.90]);
    let mut sampler = sampler(&machine, probe_config(SampleAggregation::Average));

    let err = sampler.probe_tool_length().unwrap_err();
    match err {
        MeasurementError::ToleranceExceeded { range, tolerance } => {
            assert!((range - 0.15).abs() < 1e-9);
            assert_eq!(tolerance, 0.02);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(sampler.last_result(), None);
    assert!(sampler.status().last_samples.is_empty());
    assert_eq!(machine.restore_count(), 1);
}

#[test]
fn test_motion_sequence() {
    let machine = Arc::new(SimulatedMachine::new());
    machine.set_position(Position::new(5.0, 5.0, 3.0));
    machine.script_probe([1.0, 1.0]);
    let config = ProbeConfig {
        samples: 2,
        z: 1.0,
        ..probe_config(SampleAggregation::Average)
    };
    let mut sampler = sampler(&machine, config.clone());
    sampler.probe_tool_length().unwrap();

    let moves = machine.moves();
    // lift, travel, retract between samples, final retract
    assert_eq!(moves.len(), 4);
    assert_eq!(moves[0].target, Position::new(5.0, 5.0, 11.0));
    assert_eq!(moves[1].target, Position::new(100.0, 50.0, 11.0));
    assert_eq!(moves[2].target.z, 3.0);
    assert_eq!(moves[3].target.z, 1.0 + 2.0 + 5.0);
    assert!(moves.iter().all(|m| m.speed == config.lift_speed));
}

#[test]
fn test_surface_not_found_restores_state() {
    let machine = Arc::new(SimulatedMachine::new());
    machine.set_probe_surface(None);
    let mut sampler = sampler(&machine, probe_config(SampleAggregation::Average));

    let err = sampler.probe_tool_length().unwrap_err();
    assert_eq!(err, MeasurementError::SurfaceNotFound { target_z: -50.0 });
    assert_eq!(machine.restore_count(), 1);
    assert_eq!(machine.pending_saved_states(), 0);
}

#[test]
fn test_sample_override_and_zero_samples() {
    let machine = Arc::new(SimulatedMachine::new());
    machine.script_probe([7.0]);
    let mut sampler = sampler(&machine, probe_config(SampleAggregation::Average));

    assert_eq!(sampler.probe_tool_length_with(Some(1)).unwrap().samples, vec![7.0]);
    assert_eq!(
        sampler.probe_tool_length_with(Some(0)),
        Err(MeasurementError::NoSamples)
    );
}

#[test]
fn test_motion_failure_aborts() {
    let machine = Arc::new(SimulatedMachine::new());
    machine.script_probe([10.0]);
    machine.script_probe_error(MachineError::MotionFailed {
        reason: "limit switch".to_string(),
    });
    let mut sampler = sampler(&machine, probe_config(SampleAggregation::Average));

    assert!(matches!(
        sampler.probe_tool_length(),
        Err(MeasurementError::Machine(MachineError::MotionFailed { .. }))
    ));
    assert_eq!(machine.restore_count(), 1);
    assert_eq!(PROBE_STATE_NAME, "tool_probe_state");
}

#[test]
fn test_restore_failure_fails_measurement() {
    let machine = Arc::new(SimulatedMachine::new());
    machine.script_probe([10.0, 10.0, 10.0]);
    machine.set_restore_failure(true);
    let mut sampler = sampler(&machine, probe_config(SampleAggregation::Average));

    assert!(matches!(
        sampler.probe_tool_length(),
        Err(MeasurementError::Machine(MachineError::StateRestoreFailed { .. }))
    ));
    assert_eq!(sampler.last_result(), None);
    // restored once explicitly, not retried on drop
    assert_eq!(machine.restore_attempts(), 1);
    assert_eq!(machine.restore_count(), 0);
}

#[test]
fn test_error_path_restores_once() {
    let machine = Arc::new(SimulatedMachine::new());
    machine.script_probe([10.00, 10.05, 9.90]);
    let mut sampler = sampler(&machine, probe_config(SampleAggregation::Average));

    assert!(sampler.probe_tool_length().is_err());
    assert_eq!(machine.restore_attempts(), 1);
    assert_eq!(machine.restore_count(), 1);

    machine.script_probe([10.0, 10.0, 10.0]);
    sampler.probe_tool_length().unwrap();
    assert_eq!(machine.restore_attempts(), 2);
}

#[test]
fn test_unrestored_measurement_is_not_stored() {
    let rig = rig(
        MonitoringConfig::default(),
        Some(probe_config(SampleAggregation::Average)),
    );
    rig.machine.script_probe([42.0, 42.0, 42.0]);
    rig.machine.set_restore_failure(true);

    let err = rig.monitor.measure_tool_length(None, true).unwrap_err();
    assert!(matches!(
        err,
        Error::Measurement(MeasurementError::Machine(
            MachineError::StateRestoreFailed { .. }
        ))
    ));
    assert!(rig.monitor.measurements(1).is_empty());
    assert_eq!(
        rig.monitor.probe_status().and_then(|s| s.last_result),
        None
    );
}

#[test]
fn test_measure_stores_only_on_request() {
    let rig = rig(
        MonitoringConfig::default(),
        Some(probe_config(SampleAggregation::Average)),
    );

    rig.machine.script_probe([42.0, 42.0, 42.0]);
    let measured = rig.monitor.measure_tool_length(None, false).unwrap();
    assert_eq!(measured.tool_id, 1);
    assert!(!measured.stored);
    assert!(rig.monitor.measurements(1).is_empty());

    rig.machine.script_probe([42.0, 42.0, 42.0]);
    rig.monitor.measure_tool_length(None, true).unwrap();
    assert_eq!(rig.monitor.measurements(1), vec![42.0]);
    assert_eq!(
        rig.monitor.probe_status().and_then(|s| s.last_result),
        Some(42.0)
    );
    // the stored length lives in the history, not the tool record
    assert_eq!(rig.registry.lock().get(1).unwrap().length, 50.0);
}

#[test]
fn test_failed_measurement_is_not_stored() {
    let rig = rig(
        MonitoringConfig::default(),
        Some(probe_config(SampleAggregation::Average)),
    );
    rig.machine.script_probe([10.00, 10.05, 9.90]);

    let err = rig.monitor.measure_tool_length(None, true).unwrap_err();
    assert!(err.is_tolerance_exceeded());
    assert!(rig.monitor.measurements(1).is_empty());
    assert_eq!(
        rig.event_count(|e| matches!(
            e,
            ToolwatchEvent::Measurement(MeasurementEvent::Failed { .. })
        )),
        1
    );
}

#[test]
fn test_measure_requires_tool() {
    let rig = rig(
        MonitoringConfig::default(),
        Some(probe_config(SampleAggregation::Average)),
    );

    assert!(matches!(
        rig.monitor.measure_tool_length(Some(9), true),
        Err(Error::Registry(RegistryError::ToolNotFound { tool_id: 9 }))
    ));

    rig.registry.lock().remove(1).unwrap();
    assert!(matches!(
        rig.monitor.measure_tool_length(None, true),
        Err(Error::Registry(RegistryError::NoToolSelected))
    ));
    assert!(rig.machine.moves().is_empty());
}

#[test]
fn test_probe_motion_is_not_a_collision() {
    let config = MonitoringConfig {
        collision_acceleration_threshold: 1.0,
        ..Default::default()
    };
    let rig = rig(config, Some(probe_config(SampleAggregation::Average)));
    rig.monitor.start_monitoring();
    assert!(rig.monitor.tick().collision.is_none());

    rig.machine.script_probe([10.0, 10.0, 10.0]);
    rig.monitor.measure_tool_length(None, true).unwrap();

    // The probe moved the head by ~100mm; the baseline is re-primed instead
    let report = rig.monitor.tick();
    assert!(report.skipped.is_none());
    assert!(report.collision.is_none());
    assert!(!rig.monitor.status().suspended);
}

mod aggregation {
    use proptest::prelude::*;
    use toolwatch_monitor::SampleAggregation;

    proptest! {
        #[test]
        fn prop_aggregate_stays_within_sample_range(
            samples in prop::collection::vec(-100.0f64..100.0, 1..12)
        ) {
            let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
            let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            for policy in [SampleAggregation::Average, SampleAggregation::Median] {
                let value = policy.aggregate(&samples).unwrap();
                prop_assert!(value >= min - 1e-9 && value <= max + 1e-9);
            }
        }
    }
}
