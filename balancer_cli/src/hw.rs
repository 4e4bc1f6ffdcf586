//! Sensor and actuator assembly: simulated beam or real pins.

use balancer_config::Config;
use balancer_hardware::{BeamParams, SimulatedBeam};
use balancer_traits::{Actuator, Clock, MonotonicClock, Ranger};

pub type BoxedRanger = Box<dyn Ranger + Send>;
pub type BoxedActuator = Box<dyn Actuator + Send>;

/// Which backend the run is using, for logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Simulated,
    Hardware,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Simulated => "sim",
            Backend::Hardware => "hardware",
        }
    }
}

pub fn beam_params(cfg: &Config) -> BeamParams {
    let s = &cfg.sim;
    BeamParams {
        near_stop_cm: s.near_stop_cm,
        far_stop_cm: s.far_stop_cm,
        start_cm: s.start_cm,
        lever_ratio: s.lever_ratio,
        damping_per_s: s.damping_per_s,
        jitter_cm: s.jitter_cm,
        dropout_every: s.dropout_every,
        speed_cm_per_us: cfg.sensor.speed_cm_per_us,
        seed: s.seed,
    }
}

/// A simulated beam on `clock`; clone it into both ends of the loop.
pub fn simulated<C: Clock>(cfg: &Config, clock: C) -> SimulatedBeam<C> {
    SimulatedBeam::new(beam_params(cfg), clock)
}

/// Open the configured backend. Hardware needs the `hardware` feature and
/// is skipped when `force_sim` is set.
pub fn open(cfg: &Config, force_sim: bool) -> eyre::Result<(BoxedRanger, BoxedActuator, Backend)> {
    #[cfg(feature = "hardware")]
    if !force_sim {
        use eyre::WrapErr;
        let ranger = balancer_hardware::HardwareRanger::try_new(cfg.pins.trigger, cfg.pins.echo)
            .wrap_err_with(|| {
                format!(
                    "open hc-sr04 pins (trigger {}, echo {})",
                    cfg.pins.trigger, cfg.pins.echo
                )
            })?;
        let servo = balancer_hardware::HardwareServo::try_new(cfg.pins.servo)
            .wrap_err_with(|| format!("open servo pin {}", cfg.pins.servo))?;
        tracing::info!(
            trigger = cfg.pins.trigger,
            echo = cfg.pins.echo,
            servo = cfg.pins.servo,
            "hardware backend"
        );
        return Ok((Box::new(ranger), Box::new(servo), Backend::Hardware));
    }
    #[cfg(not(feature = "hardware"))]
    let _ = force_sim;

    let beam = simulated(cfg, MonotonicClock::new());
    tracing::info!(start_cm = cfg.sim.start_cm, "simulated backend");
    Ok((Box::new(beam.clone()), Box::new(beam), Backend::Simulated))
}
