#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Ball-on-beam balancing loop (hardware-agnostic).
//!
//! All hardware goes through `balancer_traits::Ranger` and
//! `balancer_traits::Actuator`; all timing through `balancer_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Sensing**: one echo per tick, open plausibility band, optional median
//!   (`sensor`)
//! - **Control**: pure PID law with deadband, integral clamp and output clamp
//!   (`controller`)
//! - **Scheduling**: fixed interval, late ticks skip instead of queueing
//!   (`scheduler`, `runner`)
//! - **Operator access**: telemetry snapshots, partial parameter writes and
//!   reset through a cloneable `ControlHandle` (`tuning`)
//! - **Auto-tuning**: candidate sweep scored on tilt error (`autotune`)
//!
//! ```no_run
//! use balancer_core::{ControlHandle, DistanceSensor, Runner, SensorCfg};
//! use balancer_core::mocks::{NoEchoRanger, RecordingActuator};
//! use std::time::Duration;
//!
//! let handle = ControlHandle::builder()
//!     .with_actuator(RecordingActuator::new())
//!     .build()?;
//! let sensor = DistanceSensor::new(NoEchoRanger, SensorCfg::default());
//! let mut runner = Runner::new(sensor, handle.clone(), Duration::from_millis(20));
//! runner.run_ticks(5);
//! println!("{:?}", handle.read_telemetry());
//! # Ok::<(), eyre::Report>(())
//! ```

pub mod atomic;
pub mod autotune;
pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod runner;
pub mod scheduler;
pub mod sensor;
pub mod tuning;
pub mod util;

pub use autotune::{AutoTuner, Candidate, TrialResult, TrialScore, TuneReport, default_candidates};
pub use builder::{ControlHandleBuilder, Missing, Set};
pub use config::{
    ActuatorRange, ControlCfg, ParamUpdate, SchedulerCfg, SensorCfg, TuneCfg, TuningParameters,
};
pub use controller::{ControlState, Controller, PidTerms};
pub use error::{BalancerError, BuildError, Report, Result};
pub use runner::{ControlLoop, LoopStats, Runner};
pub use scheduler::{TickDue, TickScheduler};
pub use sensor::{DistanceSensor, SensorSample};
pub use tuning::{ControlHandle, Telemetry, TickReport};
