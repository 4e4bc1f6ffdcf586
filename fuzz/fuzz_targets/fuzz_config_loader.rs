#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must either fail to parse, fail validation, or map
    // cleanly onto the core types. Nothing may panic.
    let Ok(cfg) = balancer_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let range = balancer_core::ActuatorRange::from(&cfg.actuator);
    let _ = balancer_core::SchedulerCfg::from(&cfg.scheduler).interval();
    let _ = balancer_core::SensorCfg::from(&cfg.sensor).timeout();
    let _ = range.clamp(cfg.actuator.initial_deg);
});
