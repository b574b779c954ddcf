//! Step lifecycle states.

use serde::Serialize;

/// Status of a step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step is waiting to run.
    Pending,

    /// An attempt is executing.
    Running,

    /// Step completed successfully.
    Succeeded,

    /// Step failed after its last attempt.
    Failed,

    /// Step was not run (an upstream step did not succeed, or the run stopped).
    Skipped,

    /// The last attempt exceeded its deadline.
    TimedOut,
}

impl StepStatus {
    /// Check if this is a terminal state (no more changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded | StepStatus::Failed | StepStatus::Skipped | StepStatus::TimedOut
        )
    }

    /// Whether the step ran and failed, including timeouts.
    pub fn is_failure(&self) -> bool {
        matches!(self, StepStatus::Failed | StepStatus::TimedOut)
    }

    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::Pending => '○',
            StepStatus::Running => '◉',
            StepStatus::Succeeded => '✓',
            StepStatus::Failed => '✗',
            StepStatus::Skipped => '⊘',
            StepStatus::TimedOut => '⧗',
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
            StepStatus::TimedOut => "timed out",
        };
        write!(f, "{}", s)
    }
}
