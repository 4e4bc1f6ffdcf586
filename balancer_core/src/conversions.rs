//! `From` implementations bridging `balancer_config` types to `balancer_core` types.

use std::time::Duration;

use crate::autotune::Candidate;
use crate::config::{ActuatorRange, ControlCfg, SchedulerCfg, SensorCfg, TuneCfg, TuningParameters};

impl From<&balancer_config::SensorCfg> for SensorCfg {
    fn from(c: &balancer_config::SensorCfg) -> Self {
        Self {
            timeout_ms: c.timeout_ms,
            min_cm: c.min_cm,
            max_cm: c.max_cm,
            speed_cm_per_us: c.speed_cm_per_us,
            median_window: c.median_window,
        }
    }
}

impl From<&balancer_config::ControlCfg> for ControlCfg {
    fn from(c: &balancer_config::ControlCfg) -> Self {
        Self {
            deadband_cm: c.deadband_cm,
            integral_limit: c.integral_limit,
        }
    }
}

/// Start-up tuning parameters come from the `[control]` section.
impl From<&balancer_config::ControlCfg> for TuningParameters {
    fn from(c: &balancer_config::ControlCfg) -> Self {
        Self {
            target_cm: c.target_cm,
            kp: c.kp,
            ki: c.ki,
            kd: c.kd,
        }
    }
}

impl From<&balancer_config::ActuatorCfg> for ActuatorRange {
    fn from(c: &balancer_config::ActuatorCfg) -> Self {
        Self {
            min_deg: c.min_deg,
            max_deg: c.max_deg,
        }
    }
}

impl From<&balancer_config::SchedulerCfg> for SchedulerCfg {
    fn from(c: &balancer_config::SchedulerCfg) -> Self {
        Self { tick_ms: c.tick_ms }
    }
}

impl From<&balancer_config::TuneCfg> for TuneCfg {
    fn from(c: &balancer_config::TuneCfg) -> Self {
        Self {
            settle: Duration::from_millis(c.settle_ms),
            measure: Duration::from_millis(c.measure_ms),
            poll: Duration::from_millis(c.poll_ms.max(1)),
        }
    }
}

impl From<&balancer_config::CandidateRow> for Candidate {
    fn from(r: &balancer_config::CandidateRow) -> Self {
        Self::new(r.kp, r.ki, r.kd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_config_matches_core_defaults() {
        let cfg = balancer_config::Config::default();
        assert_eq!(TuningParameters::from(&cfg.control), TuningParameters::default());
        assert_eq!(ActuatorRange::from(&cfg.actuator), ActuatorRange::default());
        assert_eq!(SchedulerCfg::from(&cfg.scheduler).interval(), Duration::from_millis(20));
        assert_eq!(SensorCfg::from(&cfg.sensor).timeout(), Duration::from_millis(40));
        let tune = TuneCfg::from(&cfg.tune);
        assert_eq!(tune.settle, Duration::from_secs(2));
        assert_eq!(tune.measure, Duration::from_secs(8));
    }
}
