use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Poll `level` until it reads `want` or `deadline` passes.
///
/// Returns the instant the level was first observed. A zero `poll_interval`
/// busy-spins, which the echo timing path needs for microsecond resolution.
pub fn wait_for_level(
    mut level: impl FnMut() -> bool,
    want: bool,
    deadline: Instant,
    poll_interval: Duration,
    on_timeout: fn() -> HwError,
) -> Result<Instant> {
    loop {
        if level() == want {
            return Ok(Instant::now());
        }
        if Instant::now() >= deadline {
            return Err(on_timeout());
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
}

/// Measure the width of the next high pulse on `is_high`.
///
/// The whole measurement (waiting for the rising edge and the falling edge)
/// is bounded by `timeout`.
pub fn measure_high_pulse(
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Duration> {
    let deadline = Instant::now() + timeout;
    let rise = wait_for_level(
        &mut is_high,
        true,
        deadline,
        poll_interval,
        || HwError::EchoStartTimeout,
    )?;
    let fall = wait_for_level(
        &mut is_high,
        false,
        deadline,
        poll_interval,
        || HwError::EchoTimeout,
    )?;
    Ok(fall.saturating_duration_since(rise))
}

/// Servo pulse width for `position_deg` on a 0..=180 degree servo.
///
/// Positions outside the servo's travel are clamped so a bad command can
/// never drive the horn into its end stop.
pub fn servo_pulse_width(position_deg: f32, min_pulse: Duration, max_pulse: Duration) -> Duration {
    let deg = if position_deg.is_finite() {
        position_deg.clamp(0.0, 180.0)
    } else {
        90.0
    };
    let span = max_pulse.saturating_sub(min_pulse);
    min_pulse + span.mul_f32(deg / 180.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_micros(500);
    const MAX: Duration = Duration::from_micros(2500);

    #[test]
    fn pulse_width_spans_the_range() {
        assert_eq!(servo_pulse_width(0.0, MIN, MAX), MIN);
        assert_eq!(servo_pulse_width(180.0, MIN, MAX), MAX);
        assert_eq!(servo_pulse_width(90.0, MIN, MAX), Duration::from_micros(1500));
    }

    #[test]
    fn pulse_width_clamps_bad_positions() {
        assert_eq!(servo_pulse_width(-20.0, MIN, MAX), MIN);
        assert_eq!(servo_pulse_width(400.0, MIN, MAX), MAX);
        assert_eq!(
            servo_pulse_width(f32::NAN, MIN, MAX),
            Duration::from_micros(1500)
        );
    }
}
