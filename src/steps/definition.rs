//! Declared step metadata.
//!
//! A [`StepDefinition`] is supplied once at registration and never changes
//! during a run. Execution state lives in [`StepRunRecord`].
//!
//! [`StepRunRecord`]: crate::steps::StepRunRecord

use std::collections::BTreeSet;
use std::time::Duration;

/// Immutable description of a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    /// Unique step id.
    pub id: String,

    /// Human-readable description.
    pub description: Option<String>,

    /// Ids of the steps that must succeed before this one runs.
    pub depends_on: BTreeSet<String>,

    /// Per-attempt deadline. Falls back to the run's default timeout.
    pub timeout: Option<Duration>,

    /// Whether a failed attempt may be retried.
    pub retryable: bool,

    /// Retry ceiling. Falls back to the run's `max_retries`.
    pub max_retries: Option<u32>,
}

impl StepDefinition {
    /// Create a definition with no dependencies that is not retried.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            depends_on: BTreeSet::new(),
            timeout: None,
            retryable: false,
            max_retries: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add dependencies.
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Mark the step retryable with an explicit retry ceiling.
    pub fn retryable(mut self, max_retries: u32) -> Self {
        self.retryable = true;
        self.max_retries = Some(max_retries);
        self
    }

    /// Whether the step lists itself as a dependency.
    pub fn has_self_dependency(&self) -> bool {
        self.depends_on.contains(&self.id)
    }

    /// Timeout to apply to each attempt.
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }

    /// Number of retries after the first attempt.
    ///
    /// Zero when the step is not retryable or retries are disabled for the run.
    pub fn effective_retries(&self, retries_enabled: bool, default_max: u32) -> u32 {
        if self.retryable && retries_enabled {
            self.max_retries.unwrap_or(default_max)
        } else {
            0
        }
    }
}
