//! Shared control state and the operator-facing handle.
//!
//! All mutable state sits behind one mutex: the tick and every handle call
//! each take it exactly once, so a reader never sees half of a parameter
//! write and a reset never interleaves with a tick. The actuator command is
//! issued while the lock is held; `Actuator::apply` does not block.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use balancer_traits::{Actuator, Clock};

use crate::config::{ParamUpdate, TuningParameters};
use crate::controller::{ControlState, Controller, PidTerms};
use crate::sensor::SensorSample;

/// Point-in-time copy of the loop, taken under the lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    /// Distance the last tick worked with (last accepted reading).
    pub distance_cm: f32,
    pub actuator_deg: f32,
    /// `distance_cm - target_cm`, before the deadband.
    pub tilt_error_cm: f32,
    pub params: TuningParameters,
    /// Milliseconds since the handle was built.
    pub timestamp_ms: u64,
    pub ticks: u64,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub sample: SensorSample,
    pub terms: PidTerms,
    pub command_deg: f32,
}

pub(crate) struct Shared {
    pub(crate) params: TuningParameters,
    pub(crate) state: ControlState,
    pub(crate) controller: Controller,
    pub(crate) actuator: Box<dyn Actuator + Send>,
    pub(crate) ticks: u64,
}

/// Cheap to clone; all clones drive the same loop.
#[derive(Clone)]
pub struct ControlHandle {
    shared: Arc<Mutex<Shared>>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl core::fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let g = self.lock();
        f.debug_struct("ControlHandle")
            .field("params", &g.params)
            .field("state", &g.state)
            .field("ticks", &g.ticks)
            .finish()
    }
}

impl ControlHandle {
    pub(crate) fn from_parts(shared: Shared, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let epoch = clock.now();
        Self {
            shared: Arc::new(Mutex::new(shared)),
            clock,
            epoch,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        // State is plain data; a panic elsewhere cannot leave it torn.
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        Arc::clone(&self.clock)
    }

    /// Run the control law on `sample` and command the actuator.
    pub fn tick(&self, sample: SensorSample) -> TickReport {
        let mut g = self.lock();
        let params = g.params;
        let (next, terms) = g.controller.update_with_terms(sample, &params, &g.state);
        g.state = next;
        g.ticks = g.ticks.saturating_add(1);
        g.actuator.apply(next.actuator_deg);
        let tick = g.ticks;
        drop(g);

        tracing::trace!(
            tick,
            valid = sample.valid,
            distance_cm = terms.distance_cm,
            error = terms.error,
            integral = terms.integral,
            derivative = terms.derivative,
            output = terms.output,
            command_deg = next.actuator_deg,
            "tick"
        );
        TickReport {
            tick,
            sample,
            terms,
            command_deg: next.actuator_deg,
        }
    }

    pub fn read_telemetry(&self) -> Telemetry {
        let timestamp_ms = self.clock.ms_since(self.epoch);
        let g = self.lock();
        Telemetry {
            distance_cm: g.state.last_distance_cm,
            actuator_deg: g.state.actuator_deg,
            tilt_error_cm: g.state.last_distance_cm - g.params.target_cm,
            params: g.params,
            timestamp_ms,
            ticks: g.ticks,
        }
    }

    /// Overwrite the fields present in `update`, all under one lock.
    /// Values are taken as given; see `ParamUpdate::validate`.
    pub fn write_parameters(&self, update: ParamUpdate) {
        if update.is_empty() {
            return;
        }
        let params = {
            let mut g = self.lock();
            update.apply_to(&mut g.params);
            g.params
        };
        tracing::info!(
            target_cm = params.target_cm,
            kp = params.kp,
            ki = params.ki,
            kd = params.kd,
            "parameters updated"
        );
    }

    /// Center the actuator and clear integral and error history.
    pub fn reset_to_center(&self) {
        let center = {
            let mut g = self.lock();
            g.state = g.controller.centered(&g.state);
            let center = g.state.actuator_deg;
            g.actuator.apply(center);
            center
        };
        tracing::info!(actuator_deg = center, "reset to center");
    }

    pub fn params(&self) -> TuningParameters {
        self.lock().params
    }

    pub fn state(&self) -> ControlState {
        self.lock().state
    }

    pub fn ticks(&self) -> u64 {
        self.lock().ticks
    }
}
