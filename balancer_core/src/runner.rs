//! The control loop: sample, tick, sleep until the next deadline.
//!
//! `Runner` drives one `DistanceSensor` against a `ControlHandle` on the
//! handle's clock. `ControlLoop` puts a runner on its own thread and stops
//! it on `stop()` or drop. Sampling happens outside the shared lock, so a
//! slow echo never blocks operator calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use balancer_traits::{Clock, Ranger};

use crate::scheduler::TickScheduler;
use crate::sensor::DistanceSensor;
use crate::tuning::{ControlHandle, TickReport};
use crate::util::saturating_micros;

/// Loop timing and sampling counters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoopStats {
    pub ticks: u64,
    /// Intervals dropped because a pass came late.
    pub skipped_intervals: u64,
    pub invalid_samples: u64,
    /// Ticks whose sample+update took longer than one interval.
    pub overruns: u64,
    pub interval_us: u64,
    pub latency_min_us: u64,
    pub latency_max_us: u64,
    pub latency_avg_us: f64,
    /// Sample standard deviation (n - 1).
    pub latency_stdev_us: f64,
}

#[derive(Debug, Default)]
struct LatencyAcc {
    n: u64,
    sum: f64,
    sum_sq: f64,
    min: u64,
    max: u64,
}

impl LatencyAcc {
    fn record(&mut self, us: u64) {
        self.min = if self.n == 0 { us } else { self.min.min(us) };
        self.max = self.max.max(us);
        self.n += 1;
        let x = us as f64;
        self.sum += x;
        self.sum_sq += x * x;
    }

    fn avg(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.sum / self.n as f64
        }
    }

    fn stdev(&self) -> f64 {
        if self.n < 2 {
            return 0.0;
        }
        let n = self.n as f64;
        let var = (self.sum_sq - self.sum * self.sum / n) / (n - 1.0);
        var.max(0.0).sqrt()
    }
}

pub struct Runner<R: Ranger> {
    sensor: DistanceSensor<R>,
    handle: ControlHandle,
    scheduler: TickScheduler,
    clock: Arc<dyn Clock + Send + Sync>,
    invalid: u64,
    overruns: u64,
    latency: LatencyAcc,
}

impl<R: Ranger> core::fmt::Debug for Runner<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Runner")
            .field("sensor", &self.sensor)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl<R: Ranger> Runner<R> {
    /// The first tick is due one `interval` from now on the handle's clock.
    pub fn new(sensor: DistanceSensor<R>, handle: ControlHandle, interval: Duration) -> Self {
        let clock = handle.clock();
        let scheduler = TickScheduler::new(interval, clock.now());
        Self {
            sensor,
            handle,
            scheduler,
            clock,
            invalid: 0,
            overruns: 0,
            latency: LatencyAcc::default(),
        }
    }

    pub fn handle(&self) -> &ControlHandle {
        &self.handle
    }

    pub fn sensor(&self) -> &DistanceSensor<R> {
        &self.sensor
    }

    /// One scheduler pass: runs a tick if one is due, otherwise nothing.
    pub fn pass(&mut self) -> Option<TickReport> {
        let started = self.clock.now();
        self.scheduler.poll(started)?;

        let sample = self.sensor.sample();
        if !sample.valid {
            self.invalid = self.invalid.saturating_add(1);
        }
        let report = self.handle.tick(sample);

        let took = self.clock.now().saturating_duration_since(started);
        self.latency.record(saturating_micros(took));
        if took > self.scheduler.interval() {
            self.overruns = self.overruns.saturating_add(1);
            tracing::warn!(
                took_us = saturating_micros(took),
                interval_us = saturating_micros(self.scheduler.interval()),
                "tick overran its interval"
            );
        }
        Some(report)
    }

    fn wait_for_next(&self) {
        let wait = self.scheduler.until_due(self.clock.now());
        self.clock.sleep(wait);
    }

    /// Run until `n` more ticks have fired.
    pub fn run_ticks(&mut self, n: u64) {
        let goal = self.scheduler.ticks().saturating_add(n);
        while self.scheduler.ticks() < goal {
            if self.pass().is_none() {
                self.wait_for_next();
            }
        }
    }

    /// Run for `duration` of clock time.
    pub fn run_for(&mut self, duration: Duration) {
        let start: Instant = self.clock.now();
        while self.clock.now().saturating_duration_since(start) < duration {
            if self.pass().is_none() {
                let left = duration.saturating_sub(self.clock.now().saturating_duration_since(start));
                let wait = self.scheduler.until_due(self.clock.now()).min(left);
                self.clock.sleep(wait);
            }
        }
    }

    /// Run until `stop` is set. Checked once per pass.
    pub fn run_until(&mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            if self.pass().is_none() {
                self.wait_for_next();
            }
        }
    }

    pub fn stats(&self) -> LoopStats {
        LoopStats {
            ticks: self.scheduler.ticks(),
            skipped_intervals: self.scheduler.skipped(),
            invalid_samples: self.invalid,
            overruns: self.overruns,
            interval_us: saturating_micros(self.scheduler.interval()),
            latency_min_us: self.latency.min,
            latency_max_us: self.latency.max,
            latency_avg_us: self.latency.avg(),
            latency_stdev_us: self.latency.stdev(),
        }
    }
}

/// A `Runner` on its own thread.
///
/// Exactly one thread per loop; it is signalled and joined on `stop()` or
/// drop. Shutdown latency is bounded by one sensor timeout plus one interval.
pub struct ControlLoop {
    handle: ControlHandle,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<LoopStats>>,
}

impl ControlLoop {
    pub fn spawn<R: Ranger + Send + 'static>(mut runner: Runner<R>) -> Self {
        let handle = runner.handle().clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let join_handle = std::thread::spawn(move || {
            tracing::debug!("control loop started");
            runner.run_until(&flag);
            let stats = runner.stats();
            tracing::debug!(ticks = stats.ticks, "control loop exiting");
            stats
        });
        Self {
            handle,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    pub fn handle(&self) -> &ControlHandle {
        &self.handle
    }

    /// Signal the thread, wait for it, and return its statistics.
    pub fn stop(mut self) -> LoopStats {
        self.shutdown_and_join().unwrap_or_default()
    }

    fn shutdown_and_join(&mut self) -> Option<LoopStats> {
        self.shutdown.store(true, Ordering::Relaxed);
        let handle = self.join_handle.take()?;
        match handle.join() {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!(?e, "control loop thread panicked");
                None
            }
        }
    }
}

impl Drop for ControlLoop {
    fn drop(&mut self) {
        let _ = self.shutdown_and_join();
    }
}
