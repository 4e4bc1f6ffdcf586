//! `balancer tune`: candidate sweep, report, optional JSON save.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use balancer_config::Config;
use balancer_core::{
    AutoTuner, Candidate, ControlHandle, ControlLoop, DistanceSensor, Runner, TrialResult,
    TuneReport, atomic::write_atomic, default_candidates,
};
use balancer_traits::clock::test_clock::TestClock;
use eyre::WrapErr;
use serde_json::json;

use crate::hw;

pub fn load_candidates(path: Option<&Path>) -> eyre::Result<Vec<Candidate>> {
    match path {
        Some(p) => {
            let rows = balancer_config::load_candidates_csv(p)?;
            Ok(rows.iter().map(Candidate::from).collect())
        }
        None => Ok(default_candidates()),
    }
}

fn builder_for(cfg: &Config) -> balancer_core::ControlHandleBuilder<balancer_core::Missing> {
    ControlHandle::builder()
        .with_params((&cfg.control).into())
        .with_control((&cfg.control).into())
        .with_range((&cfg.actuator).into())
        .with_initial_position(cfg.actuator.initial_deg)
}

/// Sweep on the simulated beam in virtual time: no wall-clock waiting.
fn sweep_virtual(cfg: &Config, candidates: &[Candidate]) -> eyre::Result<TuneReport> {
    let clock = TestClock::new();
    let beam = hw::simulated(cfg, clock.clone());
    let handle = builder_for(cfg)
        .with_actuator(beam.clone())
        .with_clock(Arc::new(clock))
        .build()?;
    let sensor = DistanceSensor::new(beam, (&cfg.sensor).into());
    let interval = balancer_core::SchedulerCfg::from(&cfg.scheduler).interval();
    let mut runner = Runner::new(sensor, handle.clone(), interval);
    let tuner = AutoTuner::new(handle, (&cfg.tune).into(), target_for(cfg));
    tuner.run(candidates, |d: Duration| runner.run_for(d))
}

/// Sweep against a live loop, waiting in real time.
fn sweep_live(cfg: &Config, force_sim: bool, candidates: &[Candidate]) -> eyre::Result<TuneReport> {
    let (ranger, actuator, backend) = hw::open(cfg, force_sim)?;
    let handle = builder_for(cfg).with_actuator(actuator).build()?;
    let sensor = DistanceSensor::new(ranger, (&cfg.sensor).into());
    let interval = balancer_core::SchedulerCfg::from(&cfg.scheduler).interval();
    let control = ControlLoop::spawn(Runner::new(sensor, handle.clone(), interval));
    tracing::info!(backend = backend.name(), "tuning against live loop");
    let tuner = AutoTuner::new(handle, (&cfg.tune).into(), target_for(cfg));
    let report = tuner.run(candidates, std::thread::sleep);
    let stats = control.stop();
    tracing::debug!(ticks = stats.ticks, "tuning loop stopped");
    report
}

fn target_for(cfg: &Config) -> f32 {
    cfg.tune.target_cm.unwrap_or(cfg.control.target_cm)
}

fn params_json(c: &Candidate) -> serde_json::Value {
    json!({ "kP": c.kp, "kI": c.ki, "kD": c.kd })
}

fn result_json(r: &TrialResult) -> serde_json::Value {
    json!({
        "score": r.score.score,
        "mean_error": r.score.mean_error,
        "std_error": r.score.std_error,
        "samples": r.samples,
    })
}

/// Results file layout: `best_params`, `best_result`, `all_results`.
pub fn report_json(report: &TuneReport) -> serde_json::Value {
    let best = report.best();
    json!({
        "best_params": best.map(|b| params_json(&b.candidate)),
        "best_result": best.map(result_json),
        "all_results": report
            .results
            .iter()
            .map(|r| json!({ "params": params_json(&r.candidate), "result": result_json(r) }))
            .collect::<Vec<_>>(),
        "failed": report.failed.iter().map(params_json).collect::<Vec<_>>(),
    })
}

fn print_report(report: &TuneReport) {
    println!("{:>3}  {:>6} {:>7} {:>6}  {:>8} {:>8} {:>8}", "#", "kP", "kI", "kD", "score", "mean", "std");
    for (i, r) in report.results.iter().enumerate() {
        let c = r.candidate;
        println!(
            "{:>3}  {:>6.3} {:>7.4} {:>6.3}  {:>8.2} {:>8.2} {:>8.2}",
            i + 1,
            c.kp,
            c.ki,
            c.kd,
            r.score.score,
            r.score.mean_error,
            r.score.std_error
        );
    }
    for c in &report.failed {
        println!("  -  {:>6.3} {:>7.4} {:>6.3}  failed", c.kp, c.ki, c.kd);
    }
    match report.best() {
        Some(b) => println!(
            "Best: kP={:.3} kI={:.4} kD={:.3} (score {:.2}, error {:.2} cm ± {:.2} cm)",
            b.candidate.kp,
            b.candidate.ki,
            b.candidate.kd,
            b.score.score,
            b.score.mean_error,
            b.score.std_error
        ),
        None => println!("No successful trials."),
    }
}

pub fn run_tune(
    cfg: &Config,
    force_sim: bool,
    candidates_path: Option<&Path>,
    save: Option<&Path>,
    realtime: bool,
    json_out: bool,
) -> eyre::Result<()> {
    let candidates = load_candidates(candidates_path)?;
    let live = realtime || (cfg!(feature = "hardware") && !force_sim);
    tracing::info!(candidates = candidates.len(), live, "tune start");

    let report = if live {
        sweep_live(cfg, force_sim, &candidates)?
    } else {
        sweep_virtual(cfg, &candidates)?
    };

    let doc = report_json(&report);
    if let Some(path) = save {
        let bytes = serde_json::to_vec_pretty(&doc).wrap_err("encode tuning results")?;
        write_atomic(path, &bytes)
            .wrap_err_with(|| format!("write tuning results to {}", path.display()))?;
        tracing::info!(path = %path.display(), "tuning results saved");
    }

    if json_out {
        println!("{doc}");
    } else {
        print_report(&report);
    }

    if report.best().is_none() {
        return Err(eyre::Report::new(balancer_core::BalancerError::Tune(
            "no candidate produced telemetry".into(),
        )));
    }
    Ok(())
}
