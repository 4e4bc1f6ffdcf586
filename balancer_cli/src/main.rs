mod cli;
mod error_fmt;
mod hw;
mod ops;
mod run;
mod tune;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use balancer_config::Config;
use balancer_core::BalancerError;
use clap::Parser;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};

fn config_error(msg: String) -> eyre::Report {
    eyre::Report::new(BalancerError::Config(msg))
}

/// Read, parse and validate the config; defaults when no path is given.
fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let cfg = match path {
        None => Config::default(),
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|e| config_error(format!("read {}: {e}", p.display())))?;
            toml::from_str::<Config>(&text)
                .map_err(|e| config_error(format!("parse {}: {e}", p.display())))?
        }
    };
    cfg.validate().map_err(|e| config_error(e.to_string()))?;
    Ok(cfg)
}

fn init_tracing(cli: &Cli, cfg: &Config) -> eyre::Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output and operator responses; logs go to stderr.
    let console = if cli.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file = match cfg.logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| config_error(format!("logging.file {} has no file name", path.display())))?;
            let appender = match cfg.logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("install tracing subscriber: {e}"))
}

fn install_ctrlc() -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }
    shutdown
}

fn real_main(cli: &Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli, &cfg)?;
    tracing::debug!(config = ?cli.config, "config loaded");

    match &cli.cmd {
        Commands::Run {
            duration_ms,
            ops_stdin,
            stats,
        } => {
            let shutdown = install_ctrlc();
            let opts = run::RunOptions {
                duration: duration_ms.map(Duration::from_millis),
                ops_stdin: *ops_stdin,
                stats: *stats,
                json: cli.json,
                force_sim: cli.sim,
            };
            run::run_loop(&cfg, &opts, shutdown)
        }
        Commands::Tune {
            candidates,
            save,
            realtime,
        } => tune::run_tune(
            &cfg,
            cli.sim,
            candidates.as_deref(),
            save.as_deref(),
            *realtime,
            cli.json,
        ),
        Commands::SelfCheck => run::self_check(&cfg, cli.sim, cli.json),
    }
}

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    let code = match real_main(&cli) {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", error_fmt::format_error_json(&err));
            } else {
                eprintln!("{}", error_fmt::humanize(&err));
            }
            error_fmt::exit_code_for_error(&err)
        }
    };
    std::process::exit(code);
}
