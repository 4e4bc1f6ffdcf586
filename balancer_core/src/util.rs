//! Common time helpers for balancer_core.

use std::time::Duration;

/// Tick interval for a configured period in milliseconds.
/// Clamps to at least 1 ms so a zero period cannot spin the loop.
#[inline]
pub fn tick_interval(tick_ms: u64) -> Duration {
    debug_assert!(tick_ms > 0, "tick_ms must be > 0");
    Duration::from_millis(tick_ms.max(1))
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
#[inline]
pub fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Whole microseconds in `d`, saturating at `u64::MAX`.
#[inline]
pub fn saturating_micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// How many whole `interval`s fit in `elapsed` (0 for a zero interval).
#[inline]
pub fn whole_intervals(elapsed: Duration, interval: Duration) -> u64 {
    if interval.is_zero() {
        return 0;
    }
    u64::try_from(elapsed.as_nanos() / interval.as_nanos()).unwrap_or(u64::MAX)
}
