//! Fixed-rate tick gating.
//!
//! A tick is due once at least one interval has elapsed since the previous
//! tick, measured against the clock. Late passes fire a single tick and
//! re-anchor on the current time; intervals missed in between are counted
//! and dropped, never replayed.

use std::time::{Duration, Instant};

use crate::util::whole_intervals;

/// Outcome of a due poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickDue {
    /// Time since the previous tick (or since start for the first one).
    pub elapsed: Duration,
    /// Whole intervals that passed without a tick.
    pub skipped: u64,
}

#[derive(Debug, Clone)]
pub struct TickScheduler {
    interval: Duration,
    last_tick: Instant,
    ticks: u64,
    skipped: u64,
}

impl TickScheduler {
    /// The first tick becomes due one interval after `start`.
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last_tick: start,
            ticks: 0,
            skipped: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks fired so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Intervals dropped because a pass came late.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Check whether a tick is due at `now`. At most one tick per call.
    pub fn poll(&mut self, now: Instant) -> Option<TickDue> {
        let elapsed = now.saturating_duration_since(self.last_tick);
        if elapsed < self.interval {
            return None;
        }
        let skipped = whole_intervals(elapsed, self.interval).saturating_sub(1);
        self.last_tick = now;
        self.ticks = self.ticks.saturating_add(1);
        self.skipped = self.skipped.saturating_add(skipped);
        if skipped > 0 {
            tracing::debug!(skipped, elapsed_ms = elapsed.as_millis() as u64, "late tick");
        }
        Some(TickDue { elapsed, skipped })
    }

    /// Time left until the next tick is due (zero if already due).
    pub fn until_due(&self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.interval.saturating_sub(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn not_due_before_interval() {
        let t0 = Instant::now();
        let mut s = TickScheduler::new(20 * MS, t0);
        assert_eq!(s.poll(t0), None);
        assert_eq!(s.poll(t0 + 19 * MS), None);
        assert_eq!(s.until_due(t0 + 5 * MS), 15 * MS);
        let due = s.poll(t0 + 20 * MS).expect("due at 20 ms");
        assert_eq!(due.skipped, 0);
        assert_eq!(s.ticks(), 1);
    }

    #[test]
    fn late_pass_fires_once_and_counts_skips() {
        let t0 = Instant::now();
        let mut s = TickScheduler::new(20 * MS, t0);
        let due = s.poll(t0 + 75 * MS).expect("late tick");
        assert_eq!(due.skipped, 2);
        // No catch-up burst.
        assert_eq!(s.poll(t0 + 75 * MS), None);
        assert_eq!(s.poll(t0 + 94 * MS), None);
        assert!(s.poll(t0 + 95 * MS).is_some());
        assert_eq!(s.ticks(), 2);
        assert_eq!(s.skipped(), 2);
    }

    #[test]
    fn re_anchors_on_actual_tick_time() {
        let t0 = Instant::now();
        let mut s = TickScheduler::new(20 * MS, t0);
        assert!(s.poll(t0 + 27 * MS).is_some());
        assert_eq!(s.until_due(t0 + 27 * MS), 20 * MS);
        assert_eq!(s.poll(t0 + 40 * MS), None);
        assert!(s.poll(t0 + 47 * MS).is_some());
    }

    #[test]
    fn clock_going_backwards_is_not_due() {
        let t0 = Instant::now() + Duration::from_secs(1);
        let mut s = TickScheduler::new(20 * MS, t0);
        assert_eq!(s.poll(t0 - 50 * MS), None);
        assert_eq!(s.until_due(t0 - 50 * MS), 20 * MS);
    }
}
