//! Type-state builder for `ControlHandle`.
//!
//! `build()` is only available once an actuator is set. `try_build()` is
//! always available and reports what is missing at runtime.

use std::marker::PhantomData;
use std::sync::Arc;

use balancer_traits::clock::{Clock, MonotonicClock};
use balancer_traits::Actuator;

use crate::config::{ActuatorRange, ControlCfg, TuningParameters};
use crate::controller::{ControlState, Controller};
use crate::error::{BuildError, Result};
use crate::tuning::{ControlHandle, Shared};

pub struct Missing;
pub struct Set;

pub struct ControlHandleBuilder<A> {
    actuator: Option<Box<dyn Actuator + Send>>,
    params: Option<TuningParameters>,
    control: Option<ControlCfg>,
    range: Option<ActuatorRange>,
    initial_deg: Option<f32>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _a: PhantomData<A>,
}

impl Default for ControlHandleBuilder<Missing> {
    fn default() -> Self {
        Self {
            actuator: None,
            params: None,
            control: None,
            range: None,
            initial_deg: None,
            clock: None,
            _a: PhantomData,
        }
    }
}

impl ControlHandle {
    pub fn builder() -> ControlHandleBuilder<Missing> {
        ControlHandleBuilder::default()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(control: &ControlCfg, range: &ActuatorRange, initial_deg: f32) -> Result<()> {
    if !(range.min_deg.is_finite() && range.max_deg.is_finite()) {
        return Err(invalid("actuator range must be finite"));
    }
    if range.min_deg >= range.max_deg {
        return Err(invalid("actuator min_deg must be < max_deg"));
    }
    if !initial_deg.is_finite() || !range.contains(initial_deg) {
        return Err(invalid("initial position must lie within the actuator range"));
    }
    if !control.deadband_cm.is_finite() || control.deadband_cm < 0.0 {
        return Err(invalid("deadband_cm must be >= 0"));
    }
    if !control.integral_limit.is_finite() || control.integral_limit <= 0.0 {
        return Err(invalid("integral_limit must be > 0"));
    }
    Ok(())
}

impl<A> ControlHandleBuilder<A> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<ControlHandle> {
        let mut actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        let params = self.params.unwrap_or_default();
        let control = self.control.unwrap_or_default();
        let range = self.range.unwrap_or_default();
        let initial_deg = self.initial_deg.unwrap_or_else(|| range.center());
        validate(&control, &range, initial_deg)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };

        // The servo sits wherever it was left; command the start position so
        // state and hardware agree from the first tick.
        actuator.apply(initial_deg);
        tracing::debug!(initial_deg, ?params, "control handle built");

        Ok(ControlHandle::from_parts(
            Shared {
                params,
                state: ControlState::at_position(initial_deg),
                controller: Controller::new(control, range),
                actuator,
                ticks: 0,
            },
            clock,
        ))
    }

    pub fn with_params(mut self, params: TuningParameters) -> Self {
        self.params = Some(params);
        self
    }
    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.control = Some(control);
        self
    }
    pub fn with_range(mut self, range: ActuatorRange) -> Self {
        self.range = Some(range);
        self
    }
    /// Start position; defaults to the middle of the range.
    pub fn with_initial_position(mut self, deg: f32) -> Self {
        self.initial_deg = Some(deg);
        self
    }
    /// Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl ControlHandleBuilder<Missing> {
    pub fn with_actuator(
        self,
        actuator: impl Actuator + Send + 'static,
    ) -> ControlHandleBuilder<Set> {
        ControlHandleBuilder {
            actuator: Some(Box::new(actuator)),
            params: self.params,
            control: self.control,
            range: self.range,
            initial_deg: self.initial_deg,
            clock: self.clock,
            _a: PhantomData,
        }
    }
}

impl ControlHandleBuilder<Set> {
    pub fn build(self) -> Result<ControlHandle> {
        self.try_build()
    }
}
