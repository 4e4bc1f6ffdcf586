#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and autotune candidate parsing for the balancer.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; an empty file yields the stock rig.
//! - The candidate CSV loader enforces headers and rejects non-finite gains.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    /// HC-SR04 TRIG (BCM numbering)
    pub trigger: u8,
    /// HC-SR04 ECHO, through a 5V->3V3 divider
    pub echo: u8,
    /// Servo signal
    pub servo: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            trigger: 23,
            echo: 24,
            servo: 18,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    /// Max wait for an echo (ms); 40 ms covers ~6.8 m round trip.
    pub timeout_ms: u64,
    /// Readings at or below this are rejected (cm).
    pub min_cm: f32,
    /// Readings at or above this are rejected (cm).
    pub max_cm: f32,
    /// Speed of sound in cm per microsecond.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Initial setpoint (cm from the sensor).
    pub target_cm: f32,
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Errors smaller than this are treated as zero (cm).
    pub deadband_cm: f32,
    /// Symmetric clamp on the integral accumulator.
    pub integral_limit: f32,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            target_cm: 15.0,
            kp: 0.5,
            ki: 0.0,
            kd: 0.0,
            deadband_cm: 0.5,
            integral_limit: 100.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ActuatorCfg {
    pub min_deg: f32,
    pub max_deg: f32,
    /// Position commanded at start-up.
    pub initial_deg: f32,
}

impl Default for ActuatorCfg {
    fn default() -> Self {
        Self {
            min_deg: 0.0,
            max_deg: 180.0,
            initial_deg: 90.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerCfg {
    /// Control tick period (ms).
    pub tick_ms: u64,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self { tick_ms: 20 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TuneCfg {
    /// Time given to each candidate before measuring (ms).
    pub settle_ms: u64,
    /// Measurement window per candidate (ms).
    pub measure_ms: u64,
    /// Telemetry poll interval inside the window (ms).
    pub poll_ms: u64,
    /// Setpoint used while tuning; defaults to control.target_cm.
    pub target_cm: Option<f32>,
}

impl Default for TuneCfg {
    fn default() -> Self {
        Self {
            settle_ms: 2_000,
            measure_ms: 8_000,
            poll_ms: 100,
            target_cm: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    pub near_stop_cm: f32,
    pub far_stop_cm: f32,
    pub start_cm: f32,
    pub lever_ratio: f32,
    pub damping_per_s: f32,
    pub jitter_cm: f32,
    /// Every Nth echo is lost (0 = never).
    pub dropout_every: u32,
    pub seed: u32,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            near_stop_cm: 3.0,
            far_stop_cm: 35.0,
            start_cm: 25.0,
            lever_ratio: 0.15,
            damping_per_s: 2.0,
            jitter_cm: 0.2,
            dropout_every: 0,
            seed: 0x2545_f491,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub sensor: SensorCfg,
    pub control: ControlCfg,
    pub actuator: ActuatorCfg,
    pub scheduler: SchedulerCfg,
    pub logging: Logging,
    pub tune: TuneCfg,
    /// Simulated plant used when no hardware backend is compiled in
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Autotune candidate CSV schema.
///
/// Expected headers:
/// kp,ki,kd
///
/// Example:
/// kp,ki,kd
/// 0.52,0.02,0.02
/// 0.72,0.07,0.32
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CandidateRow {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

pub fn load_candidates_csv(path: &std::path::Path) -> eyre::Result<Vec<CandidateRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open candidate CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["kp", "ki", "kd"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "candidate CSV must have headers 'kp,ki,kd', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CandidateRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if !(row.kp.is_finite() && row.ki.is_finite() && row.kd.is_finite()) {
            eyre::bail!("invalid CSV row {}: gains must be finite", idx + 2);
        }
        rows.push(row);
    }
    if rows.is_empty() {
        eyre::bail!("candidate CSV {:?} has no rows", path);
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        if self.sensor.timeout_ms == 0 {
            eyre::bail!("sensor.timeout_ms must be >= 1");
        }
        if self.sensor.timeout_ms > 1_000 {
            eyre::bail!("sensor.timeout_ms is unreasonably large (>1s)");
        }
        if !(self.sensor.min_cm.is_finite() && self.sensor.max_cm.is_finite()) {
            eyre::bail!("sensor.min_cm and sensor.max_cm must be finite");
        }
        if self.sensor.min_cm < 0.0 {
            eyre::bail!("sensor.min_cm must be >= 0");
        }
        if self.sensor.max_cm <= self.sensor.min_cm {
            eyre::bail!("sensor.max_cm must be > sensor.min_cm");
        }
        if !(self.sensor.speed_cm_per_us.is_finite() && self.sensor.speed_cm_per_us > 0.0) {
            eyre::bail!("sensor.speed_cm_per_us must be > 0");
        }
        if self.sensor.median_window == 0 {
            eyre::bail!("sensor.median_window must be >= 1");
        }

        // Control: gains and setpoint are deliberately unbounded, only finite
        let c = &self.control;
        if ![c.target_cm, c.kp, c.ki, c.kd].iter().all(|v| v.is_finite()) {
            eyre::bail!("control.target_cm, kp, ki and kd must be finite");
        }
        if !(c.deadband_cm.is_finite() && c.deadband_cm >= 0.0) {
            eyre::bail!("control.deadband_cm must be >= 0");
        }
        if !(c.integral_limit.is_finite() && c.integral_limit > 0.0) {
            eyre::bail!("control.integral_limit must be > 0");
        }

        // Actuator
        let a = &self.actuator;
        if ![a.min_deg, a.max_deg, a.initial_deg]
            .iter()
            .all(|v| v.is_finite())
        {
            eyre::bail!("actuator positions must be finite");
        }
        if a.max_deg <= a.min_deg {
            eyre::bail!("actuator.max_deg must be > actuator.min_deg");
        }
        if !(a.min_deg..=a.max_deg).contains(&a.initial_deg) {
            eyre::bail!("actuator.initial_deg must be within [min_deg, max_deg]");
        }

        // Scheduler
        if self.scheduler.tick_ms == 0 {
            eyre::bail!("scheduler.tick_ms must be >= 1");
        }
        if self.scheduler.tick_ms > 1_000 {
            eyre::bail!("scheduler.tick_ms is unreasonably large (>1s)");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        // Tune
        if self.tune.measure_ms == 0 {
            eyre::bail!("tune.measure_ms must be >= 1");
        }
        if self.tune.poll_ms == 0 {
            eyre::bail!("tune.poll_ms must be >= 1");
        }
        if self.tune.poll_ms > self.tune.measure_ms {
            eyre::bail!("tune.poll_ms must be <= tune.measure_ms");
        }
        if let Some(t) = self.tune.target_cm
            && !t.is_finite()
        {
            eyre::bail!("tune.target_cm must be finite");
        }

        // Sim
        let s = &self.sim;
        if s.far_stop_cm <= s.near_stop_cm {
            eyre::bail!("sim.far_stop_cm must be > sim.near_stop_cm");
        }
        if !(s.near_stop_cm..=s.far_stop_cm).contains(&s.start_cm) {
            eyre::bail!("sim.start_cm must be within the beam stops");
        }
        if !(s.lever_ratio.is_finite() && s.lever_ratio > 0.0) {
            eyre::bail!("sim.lever_ratio must be > 0");
        }
        if !(s.damping_per_s.is_finite() && s.damping_per_s >= 0.0) {
            eyre::bail!("sim.damping_per_s must be >= 0");
        }
        if !(s.jitter_cm.is_finite() && s.jitter_cm >= 0.0) {
            eyre::bail!("sim.jitter_cm must be >= 0");
        }

        Ok(())
    }
}
