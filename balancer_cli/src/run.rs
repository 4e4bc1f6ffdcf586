//! `balancer run`: live loop, optional operator channel, stats on exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use balancer_config::Config;
use balancer_core::{ControlHandle, ControlLoop, DistanceSensor, LoopStats, Runner, SchedulerCfg};
use serde_json::json;

use crate::hw;
use crate::ops::{self, TelemetryJson};

/// How often the main thread checks for shutdown or the deadline.
const WATCH_PERIOD: Duration = Duration::from_millis(10);

pub struct RunOptions {
    pub duration: Option<Duration>,
    pub ops_stdin: bool,
    pub stats: bool,
    pub json: bool,
    pub force_sim: bool,
}

pub fn build_handle(cfg: &Config, actuator: hw::BoxedActuator) -> eyre::Result<ControlHandle> {
    ControlHandle::builder()
        .with_actuator(actuator)
        .with_params((&cfg.control).into())
        .with_control((&cfg.control).into())
        .with_range((&cfg.actuator).into())
        .with_initial_position(cfg.actuator.initial_deg)
        .build()
}

pub fn run_loop(cfg: &Config, opts: &RunOptions, shutdown: Arc<AtomicBool>) -> eyre::Result<()> {
    let (ranger, actuator, backend) = hw::open(cfg, opts.force_sim)?;
    let handle = build_handle(cfg, actuator)?;
    let sensor = DistanceSensor::new(ranger, (&cfg.sensor).into());
    let interval = SchedulerCfg::from(&cfg.scheduler).interval();
    let control = ControlLoop::spawn(Runner::new(sensor, handle.clone(), interval));
    tracing::info!(
        backend = backend.name(),
        tick_ms = cfg.scheduler.tick_ms,
        target_cm = cfg.control.target_cm,
        "balancing started"
    );

    if opts.ops_stdin {
        let h = handle.clone();
        // Detached: a blocked stdin read must not hold up shutdown.
        std::thread::spawn(move || {
            // Unlocked stdout: the final report must not wait on this thread.
            match ops::serve(&h, std::io::stdin().lock(), std::io::stdout()) {
                Ok(n) => tracing::debug!(requests = n, "operator channel closed"),
                Err(e) => tracing::warn!(error = %e, "operator channel failed"),
            }
        });
    }

    let started = Instant::now();
    while !shutdown.load(Ordering::Relaxed) {
        if let Some(limit) = opts.duration
            && started.elapsed() >= limit
        {
            break;
        }
        std::thread::sleep(WATCH_PERIOD);
    }

    let stats = control.stop();
    let t = handle.read_telemetry();
    tracing::info!(ticks = stats.ticks, "balancing stopped");

    if opts.json {
        println!(
            "{}",
            json!({
                "event": "stopped",
                "telemetry": TelemetryJson::from(&t),
                "ticks": stats.ticks,
                "skipped": stats.skipped_intervals,
                "invalid_samples": stats.invalid_samples,
            })
        );
    } else {
        println!(
            "Stopped after {} ticks: distance {:.2} cm, actuator {:.1}°, tilt error {:.2} cm",
            stats.ticks, t.distance_cm, t.actuator_deg, t.tilt_error_cm
        );
    }
    if opts.stats {
        print_stats(&stats);
    }
    Ok(())
}

/// Print latency/jitter stats to stderr.
fn print_stats(s: &LoopStats) {
    eprintln!("\n--- Balancer Stats ---");
    eprintln!("Ticks: {}", s.ticks);
    eprintln!("Interval (us): {}", s.interval_us);
    eprintln!(
        "Latency min/avg/max/stdev (us): {} / {:.1} / {} / {:.1}",
        s.latency_min_us, s.latency_avg_us, s.latency_max_us, s.latency_stdev_us
    );
    eprintln!("Overruns (> interval): {}", s.overruns);
    eprintln!("Skipped intervals: {}", s.skipped_intervals);
    eprintln!("Invalid samples: {}", s.invalid_samples);
    eprintln!("----------------------\n");
}

/// One reading through the configured sensor, plus a centering command.
pub fn self_check(cfg: &Config, force_sim: bool, json_out: bool) -> eyre::Result<()> {
    let (ranger, actuator, backend) = hw::open(cfg, force_sim)?;
    let handle = build_handle(cfg, actuator)?;
    handle.reset_to_center();
    let mut sensor = DistanceSensor::new(ranger, (&cfg.sensor).into());
    let sample = sensor.sample();
    if json_out {
        println!(
            "{}",
            json!({
                "backend": backend.name(),
                "valid": sample.valid,
                "distance": sample.valid.then_some(sample.distance_cm),
                "actuatorPosition": handle.state().actuator_deg,
            })
        );
    } else if sample.valid {
        println!(
            "OK ({}): distance {:.2} cm, actuator centered at {:.1}°",
            backend.name(),
            sample.distance_cm,
            handle.state().actuator_deg
        );
    } else {
        println!("WARN ({}): no valid echo within {} ms", backend.name(), cfg.sensor.timeout_ms);
    }
    if !sample.valid {
        return Err(eyre::Report::new(balancer_core::BalancerError::Timeout));
    }
    Ok(())
}
