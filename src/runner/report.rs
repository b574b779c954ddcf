//! Run report and error aggregation.
//!
//! The [`ErrorAggregator`] is the single writer of a run's results. The
//! scheduler hands it each terminal [`StepRunRecord`] as it completes and
//! receives a [`Verdict`] telling it whether to keep dispatching.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::steps::{StepError, StepOutput, StepRunRecord, StepStatus};

use super::context::RunContext;

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step succeeded.
    Succeeded,
    /// Some steps succeeded, others failed or were skipped.
    PartialFailure,
    /// No step succeeded.
    Failed,
    /// A failure or the circuit breaker stopped the run early.
    Aborted,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::PartialFailure => "partial failure",
            RunStatus::Failed => "failed",
            RunStatus::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}

/// Why a run stopped dispatching.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// A step failed while `continue_on_error` was off.
    #[error("step '{step}' failed and continue_on_error is disabled")]
    StepFailed { step: String },

    /// More steps failed than the configured ceiling allows.
    #[error("circuit breaker tripped: {failures} failed steps exceed the limit of {ceiling}")]
    CircuitBreaker { failures: usize, ceiling: usize },
}

/// A failed step, in the order failures were recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEntry {
    pub step: String,
    pub attempts: u32,
    pub error: StepError,
    pub at: DateTime<Utc>,
}

/// Decision returned for every recorded step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Keep dispatching.
    Continue,
    /// Stop dispatching new work.
    Halt(AbortReason),
}

/// Collects terminal step records and applies the run's error policy.
#[derive(Debug)]
pub struct ErrorAggregator {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    clock: Instant,
    continue_on_error: bool,
    max_failed_steps: Option<usize>,
    waves: Vec<Vec<String>>,
    records: BTreeMap<String, StepRunRecord>,
    errors: Vec<ErrorEntry>,
    failures: usize,
    abort: Option<AbortReason>,
}

impl ErrorAggregator {
    /// Create an aggregator for a run.
    pub fn new(
        run: &RunContext,
        continue_on_error: bool,
        max_failed_steps: Option<usize>,
        waves: Vec<Vec<String>>,
    ) -> Self {
        Self {
            run_id: run.run_id(),
            started_at: run.started_at(),
            clock: Instant::now(),
            continue_on_error,
            max_failed_steps,
            waves,
            records: BTreeMap::new(),
            errors: Vec::new(),
            failures: 0,
            abort: None,
        }
    }

    /// Record a terminal step.
    ///
    /// Returns `Halt` exactly once, for the record that triggers an abort.
    ///
    /// # Panics
    ///
    /// Panics if the record is not terminal or the step was already recorded.
    pub fn record(&mut self, record: StepRunRecord) -> Verdict {
        assert!(
            record.status().is_terminal(),
            "step '{}' recorded while {}",
            record.step(),
            record.status()
        );
        assert!(
            !self.records.contains_key(record.step()),
            "step '{}' recorded twice",
            record.step()
        );

        let failed = record.status().is_failure();
        if failed {
            self.failures += 1;
            if let Some(error) = record.error() {
                self.errors.push(ErrorEntry {
                    step: record.step().to_string(),
                    attempts: record.attempts(),
                    error: error.clone(),
                    at: record.finished_at().unwrap_or_else(Utc::now),
                });
            }
        }

        let step = record.step().to_string();
        self.records.insert(step.clone(), record);

        if self.abort.is_some() {
            return Verdict::Continue;
        }

        let reason = match self.max_failed_steps {
            Some(ceiling) if self.failures > ceiling => Some(AbortReason::CircuitBreaker {
                failures: self.failures,
                ceiling,
            }),
            _ if failed && !self.continue_on_error => Some(AbortReason::StepFailed { step }),
            _ => None,
        };

        match reason {
            Some(reason) => {
                self.abort = Some(reason.clone());
                Verdict::Halt(reason)
            }
            None => Verdict::Continue,
        }
    }

    /// Terminal status of a recorded step.
    pub fn status_of(&self, step: &str) -> Option<StepStatus> {
        self.records.get(step).map(StepRunRecord::status)
    }

    /// Whether an abort has been decided.
    pub fn is_halted(&self) -> bool {
        self.abort.is_some()
    }

    /// Outputs of every step that succeeded so far.
    pub fn outputs(&self) -> BTreeMap<String, StepOutput> {
        self.records
            .iter()
            .filter_map(|(id, r)| r.output().map(|out| (id.clone(), out.clone())))
            .collect()
    }

    /// Finalize the run.
    pub fn finish(self) -> RunReport {
        let status = if self.abort.is_some() {
            RunStatus::Aborted
        } else if self
            .records
            .values()
            .all(|r| r.status() == StepStatus::Succeeded)
        {
            RunStatus::Succeeded
        } else if self
            .records
            .values()
            .any(|r| r.status() == StepStatus::Succeeded)
        {
            RunStatus::PartialFailure
        } else {
            RunStatus::Failed
        };

        let elapsed = self.clock.elapsed();

        RunReport {
            run_id: self.run_id,
            status,
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration_ms: elapsed.as_millis() as u64,
            waves: self.waves,
            steps: self.records,
            errors: self.errors,
            abort_reason: self.abort,
        }
    }
}

/// Final result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Planned waves, by step id.
    pub waves: Vec<Vec<String>>,
    /// Terminal record of every enabled step.
    pub steps: BTreeMap<String, StepRunRecord>,
    /// Failures in the order they were recorded.
    pub errors: Vec<ErrorEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<AbortReason>,
}

impl RunReport {
    /// Whether every step succeeded.
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Record of a step.
    pub fn step(&self, id: &str) -> Option<&StepRunRecord> {
        self.steps.get(id)
    }

    /// Status of a step.
    pub fn status_of(&self, id: &str) -> Option<StepStatus> {
        self.step(id).map(StepRunRecord::status)
    }

    /// Wall time of the run.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Counts by outcome.
    pub fn summary(&self) -> RunSummary {
        let count = |status: StepStatus| {
            self.steps
                .values()
                .filter(|r| r.status() == status)
                .count()
        };

        let succeeded = count(StepStatus::Succeeded);
        let failed = count(StepStatus::Failed);
        let timed_out = count(StepStatus::TimedOut);
        let skipped = count(StepStatus::Skipped);

        let executed = succeeded + failed + timed_out;
        let success_rate = if executed == 0 {
            0.0
        } else {
            succeeded as f64 / executed as f64 * 100.0
        };

        RunSummary {
            total: self.steps.len(),
            succeeded,
            failed,
            timed_out,
            skipped,
            success_rate,
            duration_ms: self.duration_ms,
        }
    }
}

/// Aggregate counts of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub skipped: usize,
    /// Percentage of executed steps that succeeded.
    pub success_rate: f64,
    pub duration_ms: u64,
}
