//! Distance sampling with plausibility filtering.
//!
//! One call to `DistanceSensor::sample` fires exactly one ranging pulse. A
//! missing echo or an implausible distance yields an invalid sample; the
//! controller then holds the last accepted distance. No retries here, the
//! scheduler owns the rate.

use std::collections::VecDeque;
use std::time::Duration;

use balancer_traits::Ranger;

use crate::config::SensorCfg;
use crate::hw_error::map_hw_error;

/// One measurement, fresh every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub distance_cm: f32,
    pub valid: bool,
}

impl SensorSample {
    pub fn accepted(distance_cm: f32) -> Self {
        Self {
            distance_cm,
            valid: true,
        }
    }

    /// Carries no distance; consumers must not read `distance_cm`.
    pub fn rejected() -> Self {
        Self {
            distance_cm: 0.0,
            valid: false,
        }
    }
}

/// Convert a round-trip echo time to a one-way distance.
#[inline]
pub fn echo_to_cm(echo: Duration, speed_cm_per_us: f32) -> f32 {
    let us = echo.as_secs_f64() * 1_000_000.0;
    (us * f64::from(speed_cm_per_us) / 2.0) as f32
}

pub struct DistanceSensor<R: Ranger> {
    ranger: R,
    cfg: SensorCfg,
    timeout: Duration,
    window: VecDeque<f32>,
    scratch: Vec<f32>,
    accepted: u64,
    rejected: u64,
}

impl<R: Ranger> core::fmt::Debug for DistanceSensor<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DistanceSensor")
            .field("cfg", &self.cfg)
            .field("accepted", &self.accepted)
            .field("rejected", &self.rejected)
            .finish()
    }
}

impl<R: Ranger> DistanceSensor<R> {
    pub fn new(ranger: R, cfg: SensorCfg) -> Self {
        let win = cfg.median_window.max(1);
        Self {
            ranger,
            timeout: cfg.timeout(),
            cfg,
            window: VecDeque::with_capacity(win),
            scratch: Vec::with_capacity(win),
            accepted: 0,
            rejected: 0,
        }
    }

    pub fn cfg(&self) -> &SensorCfg {
        &self.cfg
    }

    /// Readings that passed the plausibility band.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Readings dropped for a missing echo or an implausible distance.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Take one measurement. Never fails; see `SensorSample::valid`.
    pub fn sample(&mut self) -> SensorSample {
        let echo = match self.ranger.echo(self.timeout) {
            Ok(echo) => echo,
            Err(e) => {
                let kind = map_hw_error(&*e);
                self.rejected = self.rejected.saturating_add(1);
                tracing::trace!(error = %kind, "no echo");
                return SensorSample::rejected();
            }
        };

        let cm = echo_to_cm(echo, self.cfg.speed_cm_per_us);
        if !self.in_band(cm) {
            self.rejected = self.rejected.saturating_add(1);
            tracing::trace!(distance_cm = cm, "reading outside plausible band");
            return SensorSample::rejected();
        }

        self.accepted = self.accepted.saturating_add(1);
        SensorSample::accepted(self.median(cm))
    }

    #[inline]
    fn in_band(&self, cm: f32) -> bool {
        cm > self.cfg.min_cm && cm < self.cfg.max_cm
    }

    /// Median over the accepted-reading window; pass-through when the
    /// window is 1.
    fn median(&mut self, cm: f32) -> f32 {
        let win = self.cfg.median_window.max(1);
        if win == 1 {
            return cm;
        }
        self.window.push_back(cm);
        if self.window.len() > win {
            self.window.pop_front();
        }
        self.scratch.clear();
        self.scratch.extend(self.window.iter().copied());
        self.scratch.sort_unstable_by(f32::total_cmp);
        let n = self.scratch.len();
        debug_assert!(n > 0 && n <= win, "median window out of bounds");
        let mid = n / 2;
        if n.is_multiple_of(2) {
            (self.scratch[mid - 1] + self.scratch[mid]) / 2.0
        } else {
            self.scratch[mid]
        }
    }
}
