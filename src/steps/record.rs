//! Per-step execution record.
//!
//! A [`StepRunRecord`] is created `Pending` when a run starts and is driven
//! through its lifecycle by the scheduler only. The transition methods are
//! crate-private; outside the crate a record is read-only. The terminal
//! transitions consume the record, so a finished record cannot be restarted
//! without tripping an assertion.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::status::StepStatus;
use super::unit::{StepError, StepOutput};

/// Why a step was skipped instead of run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// A dependency ended in a non-success state.
    DependencyNotSucceeded {
        dependency: String,
        status: StepStatus,
    },

    /// The run stopped dispatching before this step started.
    RunAborted,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::DependencyNotSucceeded { dependency, status } => {
                write!(f, "dependency '{}' {}", dependency, status)
            }
            SkipReason::RunAborted => write!(f, "run aborted"),
        }
    }
}

/// Execution state of one step within one run.
#[derive(Debug, Clone, Serialize)]
pub struct StepRunRecord {
    step: String,
    status: StepStatus,
    attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<StepError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attempt_errors: Vec<StepError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip_reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<StepOutput>,
}

impl StepRunRecord {
    /// A fresh record for a step that has not started.
    pub(crate) fn pending(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Pending,
            attempts: 0,
            started_at: None,
            finished_at: None,
            error: None,
            attempt_errors: Vec::new(),
            skip_reason: None,
            output: None,
        }
    }

    /// Begin a new attempt.
    pub(crate) fn start_attempt(&mut self) {
        assert!(
            !self.status.is_terminal(),
            "step '{}' restarted after reaching {}",
            self.step,
            self.status
        );
        self.status = StepStatus::Running;
        self.attempts += 1;
        self.started_at.get_or_insert_with(Utc::now);
    }

    /// Note a failed attempt that will be retried.
    pub(crate) fn attempt_failed(&mut self, error: StepError) {
        self.attempt_errors.push(error);
    }

    /// Finish successfully.
    pub(crate) fn succeed(mut self, output: StepOutput) -> Self {
        self.terminate(StepStatus::Succeeded);
        self.output = Some(output);
        self
    }

    /// Finish with a failure; timeouts become `TimedOut`.
    pub(crate) fn fail(mut self, error: StepError) -> Self {
        let status = if error.is_timeout() {
            StepStatus::TimedOut
        } else {
            StepStatus::Failed
        };
        self.terminate(status);
        self.error = Some(error);
        self
    }

    /// Finish without running.
    pub(crate) fn skip(mut self, reason: SkipReason) -> Self {
        self.terminate(StepStatus::Skipped);
        self.skip_reason = Some(reason);
        self
    }

    fn terminate(&mut self, status: StepStatus) {
        assert!(
            !self.status.is_terminal(),
            "step '{}' already finished as {}",
            self.step,
            self.status
        );
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// Step id.
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Current status.
    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Number of attempts started.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// When the first attempt started.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the record became terminal.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Wall time from first attempt to finish.
    pub fn duration(&self) -> Option<std::time::Duration> {
        let elapsed = self.finished_at? - self.started_at?;
        elapsed.to_std().ok()
    }

    /// Error of the final attempt.
    pub fn error(&self) -> Option<&StepError> {
        self.error.as_ref()
    }

    /// Errors of earlier attempts that were retried.
    pub fn attempt_errors(&self) -> &[StepError] {
        &self.attempt_errors
    }

    /// Why the step was skipped.
    pub fn skip_reason(&self) -> Option<&SkipReason> {
        self.skip_reason.as_ref()
    }

    /// Output of the successful attempt.
    pub fn output(&self) -> Option<&StepOutput> {
        self.output.as_ref()
    }
}
