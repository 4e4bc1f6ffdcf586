pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Ultrasonic (or any time-of-flight) ranging front end.
///
/// One call fires one pulse and blocks until the echo returns or `timeout`
/// elapses. Implementations return the round-trip time; converting it to a
/// distance is the caller's job.
pub trait Ranger {
    fn echo(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<std::time::Duration, Box<dyn std::error::Error + Send + Sync>>;
}

/// Positional actuator (hobby servo) commanded in degrees.
///
/// The position is already clamped to the mechanism's travel by the caller.
/// Implementations must not block; there is no failure path.
pub trait Actuator {
    fn apply(&mut self, position_deg: f32);
}

impl<R: Ranger + ?Sized> Ranger for Box<R> {
    fn echo(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<std::time::Duration, Box<dyn std::error::Error + Send + Sync>> {
        (**self).echo(timeout)
    }
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn apply(&mut self, position_deg: f32) {
        (**self).apply(position_deg);
    }
}
