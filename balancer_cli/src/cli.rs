//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "balancer", version, about = "Ball-on-beam PID balancer")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Use the simulated beam even when built with hardware support
    #[arg(long, action = ArgAction::SetTrue)]
    pub sim: bool,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the balancing loop until Ctrl-C (or for a fixed time)
    Run {
        /// Stop after this many milliseconds
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Read operator requests as JSON lines on stdin, answer on stdout
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Serve the operator channel on stdin/stdout while the loop runs.\n\nOne JSON object per line:\n  {\"op\":\"get\"}\n  {\"op\":\"update\",\"kP\":0.6,\"target\":14}\n  {\"op\":\"reset\"}\nEach request gets exactly one JSON line back. Malformed lines are answered with {\"status\":\"error\",...} and never reach the controller."
        )]
        ops_stdin: bool,
        /// Print control loop timing stats on exit
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// Sweep PID candidates and apply the best one
    Tune {
        /// Candidate CSV with header kp,ki,kd; built-in table when omitted
        #[arg(long, value_name = "FILE")]
        candidates: Option<PathBuf>,
        /// Write results as JSON (best_params, best_result, all_results)
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
        /// Wait in wall-clock time even in simulation
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
    },
    /// Take one reading and report whether the sensor and actuator respond
    SelfCheck,
}
