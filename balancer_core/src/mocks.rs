//! Test and helper mocks for balancer_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use balancer_traits::{Actuator, Ranger};

/// A ranger that never hears an echo.
pub struct NoEchoRanger;

impl Ranger for NoEchoRanger {
    fn echo(
        &mut self,
        _timeout: Duration,
    ) -> Result<Duration, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "no echo",
        )))
    }
}

/// Replays a fixed list of echo results, then reports a missing echo.
pub struct ScriptedRanger {
    echoes: VecDeque<Option<Duration>>,
}

impl ScriptedRanger {
    pub fn new(echoes: impl IntoIterator<Item = Option<Duration>>) -> Self {
        Self {
            echoes: echoes.into_iter().collect(),
        }
    }

    /// Echo times that decode back to the given distances.
    pub fn from_cm(distances_cm: &[f32], speed_cm_per_us: f32) -> Self {
        Self::new(distances_cm.iter().map(|&cm| {
            let us = f64::from(cm) * 2.0 / f64::from(speed_cm_per_us);
            Some(Duration::from_secs_f64(us.max(0.0) / 1_000_000.0))
        }))
    }

    pub fn remaining(&self) -> usize {
        self.echoes.len()
    }
}

impl Ranger for ScriptedRanger {
    fn echo(
        &mut self,
        _timeout: Duration,
    ) -> Result<Duration, Box<dyn std::error::Error + Send + Sync>> {
        match self.echoes.pop_front().flatten() {
            Some(echo) => Ok(echo),
            None => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "scripted miss",
            ))),
        }
    }
}

/// Actuator that records every command. Clones share the log.
#[derive(Clone, Default)]
pub struct RecordingActuator {
    log: Arc<Mutex<Vec<f32>>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<f32> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<f32> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .copied()
    }
}

impl Actuator for RecordingActuator {
    fn apply(&mut self, position_deg: f32) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(position_deg);
    }
}
