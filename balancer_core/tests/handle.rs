//! Operator-facing behaviour of `ControlHandle`: the documented scenarios,
//! partial writes, reset and telemetry.

use std::sync::Arc;
use std::time::Duration;

use balancer_core::mocks::RecordingActuator;
use balancer_core::{
    ActuatorRange, ControlCfg, ControlHandle, ParamUpdate, SensorSample, TuningParameters,
};
use balancer_traits::clock::test_clock::TestClock;

fn handle_with(params: TuningParameters) -> (ControlHandle, RecordingActuator) {
    let act = RecordingActuator::new();
    let h = ControlHandle::builder()
        .with_actuator(act.clone())
        .with_params(params)
        .build()
        .expect("build");
    (h, act)
}

#[test]
fn build_commands_initial_position() {
    let (h, act) = handle_with(TuningParameters::default());
    assert_eq!(act.commands(), vec![90.0]);
    let t = h.read_telemetry();
    assert_eq!(t.actuator_deg, 90.0);
    assert_eq!(t.ticks, 0);
    assert_eq!(t.params, TuningParameters::default());
}

#[test]
fn single_proportional_tick() {
    let (h, act) = handle_with(TuningParameters::default());
    let report = h.tick(SensorSample::accepted(20.0));
    assert_eq!(report.command_deg, 87.5);
    assert_eq!(report.tick, 1);
    assert_eq!(act.last(), Some(87.5));
    let s = h.state();
    assert_eq!(s.previous_error, 5.0);
    assert_eq!(s.integral, 5.0);
}

#[test]
fn deadband_tick_holds_and_keeps_integral() {
    let (h, act) = handle_with(TuningParameters::default());
    h.tick(SensorSample::accepted(15.3));
    assert_eq!(act.last(), Some(90.0));
    assert_eq!(h.state().integral, 0.0);
}

#[test]
fn integral_saturates_after_many_ticks() {
    let act = RecordingActuator::new();
    let h = ControlHandle::builder()
        .with_actuator(act)
        .with_params(TuningParameters {
            target_cm: 0.0,
            kp: 0.0,
            ki: 1.0,
            kd: 0.0,
        })
        .build()
        .expect("build");
    for _ in 0..250 {
        h.tick(SensorSample::accepted(50.0));
        assert!(h.state().integral <= 100.0);
    }
    assert_eq!(h.state().integral, 100.0);
    assert_eq!(h.read_telemetry().ticks, 250);
}

#[test]
fn missed_echo_reuses_previous_distance() {
    let (h, _) = handle_with(TuningParameters::default());
    h.tick(SensorSample::accepted(22.0));
    let r = h.tick(SensorSample::rejected());
    assert!(!r.sample.valid);
    assert_eq!(r.terms.distance_cm, 22.0);
    assert_eq!(h.read_telemetry().distance_cm, 22.0);
}

#[test]
fn partial_write_leaves_other_fields() {
    let (h, _) = handle_with(TuningParameters::default());
    h.write_parameters(ParamUpdate {
        kd: Some(0.3),
        ..ParamUpdate::default()
    });
    assert_eq!(h.params(), TuningParameters {
        kd: 0.3,
        ..TuningParameters::default()
    });
}

#[test]
fn empty_write_is_a_no_op() {
    let (h, _) = handle_with(TuningParameters::default());
    h.write_parameters(ParamUpdate::default());
    assert_eq!(h.params(), TuningParameters::default());
}

#[test]
fn new_gains_apply_on_next_tick() {
    let (h, act) = handle_with(TuningParameters::default());
    h.write_parameters(ParamUpdate {
        kp: Some(1.0),
        target_cm: Some(10.0),
        ..ParamUpdate::default()
    });
    h.tick(SensorSample::accepted(20.0));
    assert_eq!(act.last(), Some(80.0));
}

#[test]
fn reset_centers_and_clears_history_idempotently() {
    let (h, act) = handle_with(TuningParameters {
        ki: 0.1,
        ..TuningParameters::default()
    });
    for _ in 0..5 {
        h.tick(SensorSample::accepted(30.0));
    }
    assert!(h.state().integral > 0.0);

    h.reset_to_center();
    let once = h.state();
    assert_eq!(once.actuator_deg, 90.0);
    assert_eq!(once.integral, 0.0);
    assert_eq!(once.previous_error, 0.0);
    assert_eq!(once.last_distance_cm, 30.0);
    assert_eq!(act.last(), Some(90.0));

    h.reset_to_center();
    assert_eq!(h.state(), once);
}

#[test]
fn reset_uses_middle_of_custom_range() {
    let act = RecordingActuator::new();
    let h = ControlHandle::builder()
        .with_actuator(act.clone())
        .with_range(ActuatorRange {
            min_deg: 40.0,
            max_deg: 120.0,
        })
        .with_initial_position(100.0)
        .build()
        .expect("build");
    assert_eq!(act.commands(), vec![100.0]);
    h.reset_to_center();
    assert_eq!(h.state().actuator_deg, 80.0);
}

#[test]
fn custom_deadband_is_used() {
    let act = RecordingActuator::new();
    let h = ControlHandle::builder()
        .with_actuator(act.clone())
        .with_control(ControlCfg {
            deadband_cm: 2.0,
            integral_limit: 100.0,
        })
        .build()
        .expect("build");
    h.tick(SensorSample::accepted(16.5));
    assert_eq!(act.last(), Some(90.0));
}

#[test]
fn telemetry_reports_tilt_and_clock_time() {
    let clock = TestClock::new();
    let (h, _) = {
        let act = RecordingActuator::new();
        let h = ControlHandle::builder()
            .with_actuator(act.clone())
            .with_clock(Arc::new(clock.clone()))
            .build()
            .expect("build");
        (h, act)
    };
    h.tick(SensorSample::accepted(18.0));
    clock.advance(Duration::from_millis(250));
    let t = h.read_telemetry();
    assert_eq!(t.timestamp_ms, 250);
    assert_eq!(t.distance_cm, 18.0);
    assert_eq!(t.tilt_error_cm, 3.0);
    assert_eq!(t.actuator_deg, 88.5);
}

#[test]
fn clones_share_one_loop() {
    let (h, _) = handle_with(TuningParameters::default());
    let other = h.clone();
    other.write_parameters(ParamUpdate {
        kp: Some(2.0),
        ..ParamUpdate::default()
    });
    assert_eq!(h.params().kp, 2.0);
    other.tick(SensorSample::accepted(15.0));
    assert_eq!(h.read_telemetry().ticks, 1);
}

#[test]
fn loop_recovers_after_nan_target_is_corrected() {
    let (h, act) = handle_with(TuningParameters::default());
    h.write_parameters(ParamUpdate {
        target_cm: Some(f32::NAN),
        ..ParamUpdate::default()
    });
    h.tick(SensorSample::accepted(20.0));
    assert_eq!(act.last(), Some(90.0));
    assert_eq!(h.state().integral, 0.0);

    h.write_parameters(ParamUpdate {
        target_cm: Some(15.0),
        ..ParamUpdate::default()
    });
    for _ in 0..5 {
        h.tick(SensorSample::accepted(20.0));
        let s = h.state();
        assert!(s.integral.abs() <= 100.0, "integral {}", s.integral);
        assert!(s.previous_error.is_finite());
    }
    assert_eq!(h.state().integral, 25.0);
    assert!(act.last().is_some_and(|deg| deg < 90.0), "{:?}", act.last());
}
