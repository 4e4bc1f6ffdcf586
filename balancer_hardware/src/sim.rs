//! Ball-on-beam plant for running the controller without hardware.
//!
//! One `SimulatedBeam` is cloned into the sensor side (`Ranger`) and the
//! actuator side (`Actuator`); both clones share the same physics state.
//! Physics advance by the clock time elapsed since the previous call, so the
//! plant runs in real time under `MonotonicClock` and instantly under a
//! manually advanced clock.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use balancer_traits::{Actuator, Clock, Ranger};

use crate::error::HwError;

const GRAVITY_CM_S2: f32 = 981.0;
/// Solid ball rolling without slipping.
const ROLLING_FACTOR: f32 = 5.0 / 7.0;
const SUBSTEP: Duration = Duration::from_millis(1);
const MAX_ADVANCE: Duration = Duration::from_secs(1);
const LEVEL_DEG: f32 = 90.0;

#[derive(Debug, Clone)]
pub struct BeamParams {
    /// Closest the ball can get to the sensor (cm).
    pub near_stop_cm: f32,
    /// Farthest the ball can get from the sensor (cm).
    pub far_stop_cm: f32,
    /// Ball distance at power-up (cm).
    pub start_cm: f32,
    /// Beam tilt per degree of servo travel.
    pub lever_ratio: f32,
    /// Viscous damping (1/s).
    pub damping_per_s: f32,
    /// Peak uniform measurement noise (cm).
    pub jitter_cm: f32,
    /// Every Nth echo is lost (0 disables dropouts).
    pub dropout_every: u32,
    /// Propagation speed used to turn distance back into echo time.
    pub speed_cm_per_us: f32,
    pub seed: u32,
}

impl Default for BeamParams {
    fn default() -> Self {
        Self {
            near_stop_cm: 3.0,
            far_stop_cm: 35.0,
            start_cm: 25.0,
            lever_ratio: 0.15,
            damping_per_s: 2.0,
            jitter_cm: 0.2,
            dropout_every: 0,
            speed_cm_per_us: 0.0343,
            seed: 0x2545_f491,
        }
    }
}

#[derive(Debug)]
struct BeamState {
    position_cm: f32,
    velocity_cm_s: f32,
    servo_deg: f32,
    last_update: Option<Instant>,
    echoes: u64,
    rng: u32,
}

impl BeamState {
    fn advance(&mut self, now: Instant, p: &BeamParams) {
        let Some(last) = self.last_update.replace(now) else {
            return;
        };
        let mut remaining = now.saturating_duration_since(last).min(MAX_ADVANCE);
        let tilt = ((self.servo_deg - LEVEL_DEG) * p.lever_ratio).to_radians();
        while !remaining.is_zero() {
            let step = remaining.min(SUBSTEP);
            remaining -= step;
            let dt = step.as_secs_f32();
            let accel = ROLLING_FACTOR * GRAVITY_CM_S2 * tilt.sin()
                - p.damping_per_s * self.velocity_cm_s;
            self.velocity_cm_s += accel * dt;
            self.position_cm += self.velocity_cm_s * dt;
            if self.position_cm <= p.near_stop_cm {
                self.position_cm = p.near_stop_cm;
                self.velocity_cm_s = 0.0;
            } else if self.position_cm >= p.far_stop_cm {
                self.position_cm = p.far_stop_cm;
                self.velocity_cm_s = 0.0;
            }
        }
    }

    /// xorshift32 mapped to [-1, 1].
    fn noise(&mut self) -> f32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

/// Simulated plant; clone it to hand out the sensor and actuator ends.
#[derive(Debug, Clone)]
pub struct SimulatedBeam<C: Clock> {
    state: Arc<Mutex<BeamState>>,
    params: Arc<BeamParams>,
    clock: C,
}

impl<C: Clock> SimulatedBeam<C> {
    pub fn new(params: BeamParams, clock: C) -> Self {
        let state = BeamState {
            position_cm: params.start_cm,
            velocity_cm_s: 0.0,
            servo_deg: LEVEL_DEG,
            last_update: None,
            echoes: 0,
            rng: params.seed.max(1),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            params: Arc::new(params),
            clock,
        }
    }

    /// True ball distance from the sensor, without measurement noise.
    pub fn position_cm(&self) -> f32 {
        self.lock().position_cm
    }

    /// Last servo position commanded by the controller.
    pub fn servo_deg(&self) -> f32 {
        self.lock().servo_deg
    }

    /// Place the ball at `cm` and stop it.
    pub fn place_ball(&self, cm: f32) {
        let mut st = self.lock();
        st.position_cm = cm.clamp(self.params.near_stop_cm, self.params.far_stop_cm);
        st.velocity_cm_s = 0.0;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BeamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock> Ranger for SimulatedBeam<C> {
    fn echo(&mut self, timeout: Duration) -> Result<Duration, Box<dyn std::error::Error + Send + Sync>> {
        let now = self.clock.now();
        let measured = {
            let mut st = self.lock();
            st.advance(now, &self.params);
            st.echoes = st.echoes.wrapping_add(1);
            let dropped = self.params.dropout_every > 0
                && st.echoes % u64::from(self.params.dropout_every) == 0;
            if dropped {
                None
            } else {
                Some(st.position_cm + st.noise() * self.params.jitter_cm)
            }
        };
        match measured {
            Some(cm) => {
                let round_trip_us = 2.0 * cm.max(0.0) / self.params.speed_cm_per_us;
                Ok(Duration::from_secs_f32(round_trip_us / 1_000_000.0))
            }
            None => {
                // A lost echo costs the full wait on real hardware.
                self.clock.sleep(timeout);
                Err(Box::new(HwError::EchoStartTimeout))
            }
        }
    }
}

impl<C: Clock> Actuator for SimulatedBeam<C> {
    fn apply(&mut self, position_deg: f32) {
        let now = self.clock.now();
        let mut st = self.lock();
        st.advance(now, &self.params);
        st.servo_deg = position_deg;
    }
}
