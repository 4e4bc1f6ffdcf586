//! Candidate-sweep PID tuner.
//!
//! Each candidate is written through the `ControlHandle`, given time to
//! settle, then scored on the absolute tilt error sampled from telemetry:
//! `score = 2 * mean + std` (population std). Lowest score wins and is
//! applied when the sweep ends.
//!
//! Waiting is injected. A live loop passes a real sleep; a simulation passes
//! a closure that advances its `Runner` by the same amount of clock time.

use std::time::Duration;

use crate::config::{ParamUpdate, TuneCfg};
use crate::error::{BalancerError, Result};
use crate::tuning::ControlHandle;
use crate::util::whole_intervals;

/// Gain set under test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Candidate {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }
}

/// Sweep used when no candidate file is given. Varies each gain around
/// kP 0.52 / kI 0.02 / kD 0.02, plus a few mixed sets.
pub fn default_candidates() -> Vec<Candidate> {
    vec![
        Candidate::new(0.32, 0.02, 0.02),
        Candidate::new(0.52, 0.02, 0.02),
        Candidate::new(0.82, 0.02, 0.02),
        Candidate::new(0.52, 0.07, 0.02),
        Candidate::new(0.52, 0.12, 0.02),
        Candidate::new(0.52, 0.02, 0.22),
        Candidate::new(0.52, 0.02, 0.52),
        Candidate::new(0.72, 0.07, 0.32),
        Candidate::new(0.40, 0.08, 0.20),
        Candidate::new(0.62, 0.05, 0.42),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialScore {
    pub score: f64,
    pub mean_error: f64,
    pub std_error: f64,
}

/// Score a set of absolute errors; `None` when there are none.
pub fn score_errors(errors: &[f32]) -> Option<TrialScore> {
    if errors.is_empty() {
        return None;
    }
    let n = errors.len() as f64;
    let mean = errors.iter().map(|&e| f64::from(e)).sum::<f64>() / n;
    let var = errors
        .iter()
        .map(|&e| (f64::from(e) - mean).powi(2))
        .sum::<f64>()
        / n;
    let std = var.sqrt();
    Some(TrialScore {
        score: mean * 2.0 + std,
        mean_error: mean,
        std_error: std,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialResult {
    pub candidate: Candidate,
    pub score: TrialScore,
    /// Telemetry samples that went into the score.
    pub samples: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TuneReport {
    /// Successful trials in the order they ran.
    pub results: Vec<TrialResult>,
    /// Candidates whose trial produced no fresh telemetry.
    pub failed: Vec<Candidate>,
}

impl TuneReport {
    /// Lowest score; the earliest trial wins a tie.
    pub fn best(&self) -> Option<&TrialResult> {
        self.results.iter().fold(None, |best, r| match best {
            Some(b) if b.score.score <= r.score.score => Some(b),
            _ => Some(r),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AutoTuner {
    handle: ControlHandle,
    cfg: TuneCfg,
    target_cm: f32,
}

impl AutoTuner {
    pub fn new(handle: ControlHandle, cfg: TuneCfg, target_cm: f32) -> Self {
        Self {
            handle,
            cfg,
            target_cm,
        }
    }

    fn apply(&self, c: Candidate) {
        self.handle.write_parameters(ParamUpdate {
            target_cm: Some(self.target_cm),
            kp: Some(c.kp),
            ki: Some(c.ki),
            kd: Some(c.kd),
        });
    }

    /// Run one candidate. `None` if the loop produced no ticks during the
    /// measurement window.
    pub fn run_trial<W: FnMut(Duration)>(
        &self,
        candidate: Candidate,
        wait: &mut W,
    ) -> Option<TrialResult> {
        self.apply(candidate);
        let mut last_tick = self.handle.read_telemetry().ticks;
        wait(self.cfg.settle);

        let polls = whole_intervals(self.cfg.measure, self.cfg.poll).max(1);
        let mut errors = Vec::with_capacity(usize::try_from(polls).unwrap_or(0));
        for _ in 0..polls {
            let t = self.handle.read_telemetry();
            // Only count readings the loop has refreshed since the last poll.
            if t.ticks != last_tick && t.tilt_error_cm.is_finite() {
                errors.push(t.tilt_error_cm.abs());
            }
            last_tick = t.ticks;
            wait(self.cfg.poll);
        }

        let score = score_errors(&errors)?;
        Some(TrialResult {
            candidate,
            score,
            samples: errors.len(),
        })
    }

    /// Try every candidate in order, then apply the best one.
    pub fn run<W: FnMut(Duration)>(
        &self,
        candidates: &[Candidate],
        mut wait: W,
    ) -> Result<TuneReport> {
        if candidates.is_empty() {
            return Err(eyre::Report::new(BalancerError::Tune(
                "no candidates to try".into(),
            )));
        }

        let mut report = TuneReport::default();
        for (i, &c) in candidates.iter().enumerate() {
            tracing::info!(
                trial = i + 1,
                of = candidates.len(),
                kp = c.kp,
                ki = c.ki,
                kd = c.kd,
                "trial started"
            );
            match self.run_trial(c, &mut wait) {
                Some(r) => {
                    tracing::info!(
                        score = r.score.score,
                        mean_error = r.score.mean_error,
                        std_error = r.score.std_error,
                        "trial scored"
                    );
                    report.results.push(r);
                }
                None => {
                    tracing::warn!(kp = c.kp, ki = c.ki, kd = c.kd, "trial produced no samples");
                    report.failed.push(c);
                }
            }
        }

        match report.best() {
            Some(best) => {
                self.apply(best.candidate);
                tracing::info!(
                    kp = best.candidate.kp,
                    ki = best.candidate.ki,
                    kd = best.candidate.kd,
                    score = best.score.score,
                    "best candidate applied"
                );
            }
            None => tracing::warn!("no successful trials"),
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_uses_population_std() {
        let s = score_errors(&[1.0, 3.0]).expect("two samples");
        assert!((s.mean_error - 2.0).abs() < 1e-9);
        assert!((s.std_error - 1.0).abs() < 1e-9);
        assert!((s.score - 5.0).abs() < 1e-9);
    }

    #[test]
    fn empty_errors_have_no_score() {
        assert_eq!(score_errors(&[]), None);
    }

    #[test]
    fn best_prefers_earliest_on_tie() {
        let mk = |kp, score| TrialResult {
            candidate: Candidate::new(kp, 0.0, 0.0),
            score: TrialScore {
                score,
                mean_error: 0.0,
                std_error: 0.0,
            },
            samples: 1,
        };
        let report = TuneReport {
            results: vec![mk(1.0, 3.0), mk(2.0, 1.0), mk(3.0, 1.0)],
            failed: vec![],
        };
        assert_eq!(report.best().map(|r| r.candidate.kp), Some(2.0));
        assert!(TuneReport::default().best().is_none());
    }

    #[test]
    fn default_table_has_ten_sets() {
        let c = default_candidates();
        assert_eq!(c.len(), 10);
        assert_eq!(c[4], Candidate::new(0.52, 0.12, 0.02));
    }
}
