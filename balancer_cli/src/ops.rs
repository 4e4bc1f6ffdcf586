//! JSON-lines operator channel.
//!
//! Request lines: `{"op":"get"}`, `{"op":"update","kP":..,"kI":..,"kD":..,"target":..}`
//! (any subset of fields), `{"op":"reset"}`. Every request line gets exactly
//! one response line. Anything that does not decode is answered with an
//! error object and never reaches the controller.

use std::io::{BufRead, Write};

use balancer_core::{ControlHandle, ParamUpdate, Telemetry};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Request {
    Get,
    Update(UpdateBody),
    Reset,
}

#[derive(Debug, Deserialize)]
struct UpdateBody {
    #[serde(rename = "kP")]
    kp: Option<f32>,
    #[serde(rename = "kI")]
    ki: Option<f32>,
    #[serde(rename = "kD")]
    kd: Option<f32>,
    target: Option<f32>,
}

impl From<UpdateBody> for ParamUpdate {
    fn from(b: UpdateBody) -> Self {
        Self {
            target_cm: b.target,
            kp: b.kp,
            ki: b.ki,
            kd: b.kd,
        }
    }
}

/// Wire shape of a telemetry snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryJson {
    pub distance: f32,
    pub actuator_position: f32,
    pub tilt_error: f32,
    #[serde(rename = "kP")]
    pub kp: f32,
    #[serde(rename = "kI")]
    pub ki: f32,
    #[serde(rename = "kD")]
    pub kd: f32,
    pub target: f32,
    pub timestamp: u64,
}

impl From<&Telemetry> for TelemetryJson {
    fn from(t: &Telemetry) -> Self {
        Self {
            distance: t.distance_cm,
            actuator_position: t.actuator_deg,
            tilt_error: t.tilt_error_cm,
            kp: t.params.kp,
            ki: t.params.ki,
            kd: t.params.kd,
            target: t.params.target_cm,
            timestamp: t.timestamp_ms,
        }
    }
}

fn error(message: impl Into<String>) -> serde_json::Value {
    json!({ "status": "error", "message": message.into() })
}

/// Decode one request line, apply it, and build the response.
pub fn handle_line(handle: &ControlHandle, line: &str) -> serde_json::Value {
    let req: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "rejected operator line");
            return error(format!("malformed request: {e}"));
        }
    };
    match req {
        Request::Get => {
            let t = handle.read_telemetry();
            serde_json::to_value(TelemetryJson::from(&t))
                .unwrap_or_else(|e| error(format!("encode telemetry: {e}")))
        }
        Request::Update(body) => {
            let update = ParamUpdate::from(body);
            if let Err(e) = update.validate() {
                return error(e.to_string());
            }
            handle.write_parameters(update);
            json!({ "status": "ok" })
        }
        Request::Reset => {
            handle.reset_to_center();
            json!({ "status": "reset" })
        }
    }
}

/// Serve requests from `input` until EOF, one response line per request.
/// Blank lines are skipped.
pub fn serve<R: BufRead, W: Write>(
    handle: &ControlHandle,
    input: R,
    mut output: W,
) -> std::io::Result<u64> {
    let mut served = 0u64;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let resp = handle_line(handle, &line);
        writeln!(output, "{resp}")?;
        output.flush()?;
        served += 1;
    }
    Ok(served)
}
