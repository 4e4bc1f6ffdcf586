//! Auto-tuner against the simulated beam in virtual time.

use std::sync::Arc;
use std::time::Duration;

use balancer_core::{
    AutoTuner, Candidate, ControlHandle, DistanceSensor, Runner, SensorCfg, TuneCfg,
    TuningParameters,
};
use balancer_hardware::{BeamParams, SimulatedBeam};
use balancer_traits::Clock;
use balancer_traits::clock::test_clock::TestClock;

fn short_cfg() -> TuneCfg {
    TuneCfg {
        settle: Duration::from_millis(500),
        measure: Duration::from_secs(2),
        poll: Duration::from_millis(100),
    }
}

fn rig() -> (Runner<SimulatedBeam<TestClock>>, ControlHandle, TestClock) {
    let clock = TestClock::new();
    let plant = SimulatedBeam::new(
        BeamParams {
            jitter_cm: 0.0,
            ..BeamParams::default()
        },
        clock.clone(),
    );
    let handle = ControlHandle::builder()
        .with_actuator(plant.clone())
        .with_clock(Arc::new(clock.clone()))
        .build()
        .expect("build");
    let sensor = DistanceSensor::new(plant, SensorCfg::default());
    let runner = Runner::new(sensor, handle.clone(), Duration::from_millis(20));
    (runner, handle, clock)
}

#[test]
fn sweep_scores_every_candidate_and_applies_the_best() {
    let (mut runner, handle, clock) = rig();
    let tuner = AutoTuner::new(handle.clone(), short_cfg(), 15.0);
    let candidates = [
        Candidate::new(0.0, 0.0, 0.0),
        Candidate::new(0.52, 0.02, 0.22),
        Candidate::new(0.32, 0.02, 0.02),
    ];
    let report = tuner
        .run(&candidates, |d| runner.run_for(d))
        .expect("tune");

    assert_eq!(report.results.len(), 3);
    assert!(report.failed.is_empty());
    for r in &report.results {
        assert!(r.samples > 0);
        assert!(r.score.score.is_finite());
        assert!(r.score.score >= 0.0);
    }
    let best = report.best().expect("best");
    let p = handle.params();
    assert_eq!(
        (p.kp, p.ki, p.kd, p.target_cm),
        (best.candidate.kp, best.candidate.ki, best.candidate.kd, 15.0)
    );
    // settle + 20 polls per trial
    assert_eq!(clock.elapsed(), Duration::from_millis(3 * (500 + 2000)));
}

#[test]
fn stalled_loop_fails_every_trial() {
    let (_runner, handle, clock) = rig();
    let tuner = AutoTuner::new(handle.clone(), short_cfg(), 15.0);
    let before = handle.params();
    let report = tuner
        .run(&[Candidate::new(0.4, 0.0, 0.0)], |d| clock.sleep(d))
        .expect("tune");
    assert!(report.results.is_empty());
    assert_eq!(report.failed, vec![Candidate::new(0.4, 0.0, 0.0)]);
    assert!(report.best().is_none());
    // The last trial's gains stay in place; nothing better to apply.
    assert_eq!(handle.params(), TuningParameters { kp: 0.4, ki: 0.0, ..before });
}

#[test]
fn empty_candidate_list_is_an_error() {
    let (_runner, handle, _) = rig();
    let tuner = AutoTuner::new(handle, short_cfg(), 15.0);
    let err = tuner.run(&[], |_| {}).expect_err("no candidates");
    assert!(err.to_string().contains("no candidates"));
}

#[test]
fn trial_writes_target_with_gains() {
    let (mut runner, handle, _) = rig();
    let tuner = AutoTuner::new(handle.clone(), short_cfg(), 12.0);
    let r = tuner
        .run_trial(Candidate::new(0.5, 0.01, 0.1), &mut |d| runner.run_for(d))
        .expect("trial");
    assert_eq!(r.candidate, Candidate::new(0.5, 0.01, 0.1));
    assert_eq!(handle.params().target_cm, 12.0);
    assert_eq!(r.samples, 20);
}
