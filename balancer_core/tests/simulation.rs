//! Runner on the simulated beam, in virtual time.

use std::sync::Arc;
use std::time::Duration;

use balancer_core::{ControlHandle, DistanceSensor, Runner, SensorCfg, TuningParameters};
use balancer_hardware::{BeamParams, SimulatedBeam};
use balancer_traits::clock::test_clock::TestClock;

const TICK: Duration = Duration::from_millis(20);

fn rig(
    beam: BeamParams,
    params: TuningParameters,
) -> (Runner<SimulatedBeam<TestClock>>, SimulatedBeam<TestClock>, TestClock) {
    let clock = TestClock::new();
    let plant = SimulatedBeam::new(beam, clock.clone());
    let handle = ControlHandle::builder()
        .with_actuator(plant.clone())
        .with_params(params)
        .with_clock(Arc::new(clock.clone()))
        .build()
        .expect("build");
    let sensor = DistanceSensor::new(plant.clone(), SensorCfg::default());
    (Runner::new(sensor, handle, TICK), plant, clock)
}

fn quiet() -> BeamParams {
    BeamParams {
        jitter_cm: 0.0,
        ..BeamParams::default()
    }
}

#[test]
fn ticks_fire_on_the_interval() {
    let (mut runner, _, clock) = rig(quiet(), TuningParameters::default());
    runner.run_ticks(50);
    let stats = runner.stats();
    assert_eq!(stats.ticks, 50);
    assert_eq!(stats.skipped_intervals, 0);
    assert_eq!(stats.invalid_samples, 0);
    assert_eq!(clock.elapsed(), Duration::from_secs(1));
    assert_eq!(runner.handle().read_telemetry().ticks, 50);
}

#[test]
fn run_for_stops_at_the_deadline() {
    let (mut runner, _, clock) = rig(quiet(), TuningParameters::default());
    runner.run_for(Duration::from_millis(1000));
    assert_eq!(clock.elapsed(), Duration::from_millis(1000));
    // Ticks at 20, 40, ... 980 ms; the one due at 1000 ms is past the window.
    assert_eq!(runner.stats().ticks, 49);
}

#[test]
fn first_tick_sees_the_ball_where_it_starts() {
    let (mut runner, plant, _) = rig(quiet(), TuningParameters::default());
    runner.run_ticks(1);
    let t = runner.handle().read_telemetry();
    assert!((t.distance_cm - 25.0).abs() < 0.05, "{t:?}");
    // 10 cm too far, kP 0.5 -> 5 degrees down from level.
    assert!((t.actuator_deg - 85.0).abs() < 0.05, "{t:?}");
    assert!((plant.servo_deg() - t.actuator_deg).abs() < 1e-6);
}

#[test]
fn lost_echoes_are_late_ticks_not_extra_ticks() {
    let beam = BeamParams {
        dropout_every: 5,
        ..quiet()
    };
    let (mut runner, _, _) = rig(beam, TuningParameters::default());
    runner.run_ticks(10);
    let stats = runner.stats();
    assert_eq!(stats.ticks, 10);
    assert_eq!(stats.invalid_samples, 2);
    // Each miss burns the 40 ms echo timeout: two overruns, and the one
    // followed by another tick drops a 20 ms interval.
    assert_eq!(stats.overruns, 2);
    assert_eq!(stats.skipped_intervals, 1);
    assert_eq!(runner.sensor().rejected(), 2);
}

#[test]
fn actuator_stays_in_range_under_aggressive_gains() {
    let params = TuningParameters {
        target_cm: 15.0,
        kp: 8.0,
        ki: 1.0,
        kd: 4.0,
    };
    let (mut runner, plant, _) = rig(BeamParams::default(), params);
    for _ in 0..250 {
        runner.run_ticks(1);
        let s = runner.handle().state();
        assert!((0.0..=180.0).contains(&s.actuator_deg));
        assert!(s.integral.abs() <= 100.0);
        assert!((0.0..=180.0).contains(&plant.servo_deg()));
    }
}

#[test]
fn reset_mid_run_levels_the_beam() {
    let (mut runner, plant, _) = rig(quiet(), TuningParameters::default());
    runner.run_ticks(20);
    runner.handle().reset_to_center();
    assert_eq!(plant.servo_deg(), 90.0);
    assert_eq!(runner.handle().state().integral, 0.0);
    runner.run_ticks(1);
    assert_eq!(runner.handle().read_telemetry().ticks, 21);
}
