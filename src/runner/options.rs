//! Run configuration consumed by the engine.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipewaveError, Result};

/// What to do with a step whose dependency did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyFailurePolicy {
    /// Skip the step, and transitively everything downstream of it.
    #[default]
    Skip,
    /// Run the step regardless of upstream outcomes.
    RunAnyway,
}

/// Execution policy for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Steps to include, in declaration order.
    pub enabled_steps: Vec<String>,

    /// Dependency overrides; an entry replaces the step's registered `depends_on`.
    pub step_dependencies: BTreeMap<String, BTreeSet<String>>,

    /// Upper bound on concurrently running steps.
    pub max_parallel_steps: usize,

    /// Timeout for steps that do not declare their own.
    pub default_timeout: Duration,

    /// Keep running independent steps after a failure.
    pub continue_on_error: bool,

    /// Allow retryable steps to be retried at all.
    pub retry_failed_steps: bool,

    /// Retry ceiling for retryable steps that do not declare their own.
    pub max_retries: u32,

    /// Handling of steps downstream of a failure.
    pub on_dependency_failure: DependencyFailurePolicy,

    /// Circuit breaker: abort once more than this many steps have failed.
    pub max_failed_steps: Option<usize>,

    /// Per-item error policy handed to units.
    pub continue_on_item_error: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            enabled_steps: Vec::new(),
            step_dependencies: BTreeMap::new(),
            max_parallel_steps: 3,
            default_timeout: Duration::from_secs(30 * 60),
            continue_on_error: true,
            retry_failed_steps: true,
            max_retries: 2,
            on_dependency_failure: DependencyFailurePolicy::Skip,
            max_failed_steps: None,
            continue_on_item_error: true,
        }
    }
}

impl RunConfig {
    /// A default policy enabling the given steps.
    pub fn with_steps<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled_steps: steps.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel_steps == 0 {
            return Err(invalid("max_parallel_steps must be at least 1"));
        }
        if self.default_timeout.is_zero() {
            return Err(invalid("default timeout must be greater than zero"));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.enabled_steps.iter().find(|s| !seen.insert(s.as_str())) {
            return Err(invalid(format!("step '{}' is enabled more than once", dup)));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> PipewaveError {
    PipewaveError::ConfigValidationError {
        message: message.into(),
    }
}
