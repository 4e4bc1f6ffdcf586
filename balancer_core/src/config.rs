//! Runtime configuration and tuning types for the balancing loop.
//!
//! These are the structs the core works with. They are separate from the
//! TOML-deserialized config in `balancer_config`; see `conversions`.

use std::time::Duration;

use crate::error::BalancerError;

/// Live tuning parameters shared between the control tick and the operator.
///
/// No range checks: any finite value is accepted, negative gains included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningParameters {
    /// Setpoint, distance from the sensor in cm.
    pub target_cm: f32,
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Default for TuningParameters {
    fn default() -> Self {
        Self {
            target_cm: 15.0,
            kp: 0.5,
            ki: 0.0,
            kd: 0.0,
        }
    }
}

/// Partial write to `TuningParameters`; absent fields stay unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamUpdate {
    pub target_cm: Option<f32>,
    pub kp: Option<f32>,
    pub ki: Option<f32>,
    pub kd: Option<f32>,
}

impl ParamUpdate {
    pub fn is_empty(&self) -> bool {
        self.target_cm.is_none() && self.kp.is_none() && self.ki.is_none() && self.kd.is_none()
    }

    /// Reject non-finite values. Called by the decoding layer before an
    /// update is handed to the core.
    pub fn validate(&self) -> Result<(), BalancerError> {
        let fields = [
            ("target", self.target_cm),
            ("kP", self.kp),
            ("kI", self.ki),
            ("kD", self.kd),
        ];
        for (name, value) in fields {
            if let Some(v) = value
                && !v.is_finite()
            {
                return Err(BalancerError::InvalidUpdate(format!(
                    "{name} must be a finite number"
                )));
            }
        }
        Ok(())
    }

    /// Overwrite the fields present in this update.
    pub fn apply_to(&self, params: &mut TuningParameters) {
        if let Some(v) = self.target_cm {
            params.target_cm = v;
        }
        if let Some(v) = self.kp {
            params.kp = v;
        }
        if let Some(v) = self.ki {
            params.ki = v;
        }
        if let Some(v) = self.kd {
            params.kd = v;
        }
    }
}

impl From<TuningParameters> for ParamUpdate {
    fn from(p: TuningParameters) -> Self {
        Self {
            target_cm: Some(p.target_cm),
            kp: Some(p.kp),
            ki: Some(p.ki),
            kd: Some(p.kd),
        }
    }
}

/// Fixed shape of the PID law.
#[derive(Debug, Clone, Copy)]
pub struct ControlCfg {
    /// Errors with magnitude below this are treated as exactly zero (cm).
    pub deadband_cm: f32,
    /// Symmetric clamp on the integral accumulator.
    pub integral_limit: f32,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            deadband_cm: 0.5,
            integral_limit: 100.0,
        }
    }
}

/// Physical travel of the actuator in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorRange {
    pub min_deg: f32,
    pub max_deg: f32,
}

impl Default for ActuatorRange {
    fn default() -> Self {
        Self {
            min_deg: 0.0,
            max_deg: 180.0,
        }
    }
}

impl ActuatorRange {
    #[inline]
    pub fn clamp(&self, deg: f32) -> f32 {
        deg.clamp(self.min_deg, self.max_deg)
    }

    #[inline]
    pub fn center(&self) -> f32 {
        self.min_deg + (self.max_deg - self.min_deg) / 2.0
    }

    #[inline]
    pub fn contains(&self, deg: f32) -> bool {
        (self.min_deg..=self.max_deg).contains(&deg)
    }
}

/// Ranging and plausibility filtering.
#[derive(Debug, Clone)]
pub struct SensorCfg {
    /// Max echo wait per sample (ms).
    pub timeout_ms: u64,
    /// Exclusive lower bound of plausible readings (cm).
    pub min_cm: f32,
    /// Exclusive upper bound of plausible readings (cm).
    pub max_cm: f32,
    /// Propagation speed (cm/us); 0.0343 for air at ~20 C.
    pub speed_cm_per_us: f32,
    /// Median over the last N accepted readings (1 = disabled).
    pub median_window: usize,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            timeout_ms: 40,
            min_cm: 0.0,
            max_cm: 100.0,
            speed_cm_per_us: 0.0343,
            median_window: 1,
        }
    }
}

impl SensorCfg {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerCfg {
    /// Control tick period (ms).
    pub tick_ms: u64,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self { tick_ms: 20 }
    }
}

impl SchedulerCfg {
    pub fn interval(&self) -> Duration {
        crate::util::tick_interval(self.tick_ms)
    }
}

/// Auto-tuner timing.
#[derive(Debug, Clone, Copy)]
pub struct TuneCfg {
    pub settle: Duration,
    pub measure: Duration,
    pub poll: Duration,
}

impl Default for TuneCfg {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            measure: Duration::from_secs(8),
            poll: Duration::from_millis(100),
        }
    }
}
