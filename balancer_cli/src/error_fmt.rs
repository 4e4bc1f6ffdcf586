//! Human-readable error descriptions and structured JSON error formatting.

use balancer_core::error::{BalancerError, BuildError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingActuator => {
                "What happened: No actuator was provided to the control loop.\nLikely causes: The servo failed to initialize or was not wired into the builder.\nHow to fix: Ensure the servo is created successfully and passed via with_actuator(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid control setup ({msg}).\nLikely causes: Out-of-range values in [actuator] or [control].\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<BalancerError>() {
        return match de {
            BalancerError::Timeout => "What happened: The distance sensor returned no echo in time.\nLikely causes: Ball outside the sensor's view, TRIG/ECHO pins swapped or unpowered, or sensor.timeout_ms too low.\nHow to fix: Check [pins] trigger/echo and 5V/GND, place the ball on the beam, or raise sensor.timeout_ms.".to_string(),
            BalancerError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: A value in the TOML is missing or out of range.\nHow to fix: Edit the config file named in --config and try again."
            ),
            BalancerError::Tune(msg) => format!(
                "What happened: Auto-tuning did not produce a result ({msg}).\nLikely causes: The control loop was not ticking, or the candidate list is empty.\nHow to fix: Run `balancer self-check`, then retry with a non-empty candidate CSV."
            ),
            BalancerError::InvalidUpdate(msg) => format!(
                "What happened: A parameter update was rejected ({msg}).\nLikely causes: A non-numeric or non-finite gain or target.\nHow to fix: Send finite numbers for kP, kI, kD and target."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open hc-sr04") || lower.contains("open servo") {
        return format!(
            "What happened: Failed to initialize hardware pins ({msg}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO."
        );
    }

    if lower.contains("candidate csv must have headers") {
        return "Invalid headers in candidate CSV. Expected 'kp,ki,kd'.".to_string();
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 configuration, 4 sensor/hardware, 5 tuning, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<BalancerError>() {
        Some(BalancerError::Config(_)) => 3,
        Some(
            BalancerError::Timeout | BalancerError::Hardware(_) | BalancerError::HardwareFault(_),
        ) => 4,
        Some(BalancerError::Tune(_)) => 5,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<BalancerError>() {
        Some(BalancerError::Timeout) => "Timeout",
        Some(BalancerError::Hardware(_) | BalancerError::HardwareFault(_)) => "Hardware",
        Some(BalancerError::Config(_)) => "Config",
        Some(BalancerError::Tune(_)) => "Tune",
        Some(BalancerError::InvalidUpdate(_)) => "InvalidUpdate",
        Some(BalancerError::Io(_)) => "Io",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
