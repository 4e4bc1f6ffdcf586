//! PID law for the beam.
//!
//! `Controller::update` is pure: it takes the sample, the live parameters and
//! the previous state, and returns the next state plus the actuator command.
//! Locking and side effects live in `tuning::ControlHandle`.
//!
//! Sign convention: a positive error (ball farther than the setpoint) lowers
//! the actuator position. The output is *subtracted* from the current
//! position; flipping it turns the loop into positive feedback.

use crate::config::{ActuatorRange, ControlCfg, TuningParameters};
use crate::sensor::SensorSample;

/// State owned by the control tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlState {
    /// Error used on the previous tick, after the deadband.
    pub previous_error: f32,
    /// Accumulated error, always within `±integral_limit`.
    pub integral: f32,
    /// Last commanded position, always within the actuator range.
    pub actuator_deg: f32,
    /// Last accepted distance; 0.0 until the first valid reading.
    pub last_distance_cm: f32,
}

impl ControlState {
    pub fn at_position(actuator_deg: f32) -> Self {
        Self {
            actuator_deg,
            ..Self::default()
        }
    }
}

/// Intermediate values of one tick, for tracing and tests.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidTerms {
    pub distance_cm: f32,
    pub error: f32,
    pub integral: f32,
    pub derivative: f32,
    pub output: f32,
}

#[derive(Debug, Clone)]
pub struct Controller {
    control: ControlCfg,
    range: ActuatorRange,
}

impl Controller {
    pub fn new(control: ControlCfg, range: ActuatorRange) -> Self {
        Self { control, range }
    }

    pub fn range(&self) -> ActuatorRange {
        self.range
    }

    pub fn control_cfg(&self) -> ControlCfg {
        self.control
    }

    /// One tick of the PID law. Returns the next state and the position to
    /// command.
    pub fn update(
        &self,
        sample: SensorSample,
        params: &TuningParameters,
        state: &ControlState,
    ) -> (ControlState, f32) {
        let (next, _) = self.update_with_terms(sample, params, state);
        (next, next.actuator_deg)
    }

    pub fn update_with_terms(
        &self,
        sample: SensorSample,
        params: &TuningParameters,
        state: &ControlState,
    ) -> (ControlState, PidTerms) {
        let distance = if sample.valid {
            sample.distance_cm
        } else {
            state.last_distance_cm
        };

        let mut error = distance - params.target_cm;
        if error.abs() < self.control.deadband_cm {
            error = 0.0;
        }

        // Clamp after accumulating so a saturated integral starts
        // discharging on the first tick the error changes sign.
        let limit = self.control.integral_limit;
        let integral = (state.integral + error).clamp(-limit, limit);
        let derivative = error - state.previous_error;
        let output = params.kp * error + params.ki * integral + params.kd * derivative;

        let terms = PidTerms {
            distance_cm: distance,
            error,
            integral,
            derivative,
            output,
        };

        // Non-finite terms never reach the carried state; the loop resumes
        // as soon as the parameters are finite again.
        if !(error.is_finite() && integral.is_finite() && output.is_finite()) {
            let held = ControlState {
                actuator_deg: self.range.clamp(state.actuator_deg),
                last_distance_cm: distance,
                ..*state
            };
            return (held, terms);
        }

        let next = ControlState {
            previous_error: error,
            integral,
            actuator_deg: self.range.clamp(state.actuator_deg - output),
            last_distance_cm: distance,
        };
        (next, terms)
    }

    /// State after a reset: centered actuator, no integral, no error history.
    /// The last accepted distance is kept.
    pub fn centered(&self, state: &ControlState) -> ControlState {
        ControlState {
            previous_error: 0.0,
            integral: 0.0,
            actuator_deg: self.range.center(),
            last_distance_cm: state.last_distance_cm,
        }
    }
}
