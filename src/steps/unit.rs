//! The unit-of-work contract.
//!
//! Anything that implements [`StepUnit`] can be registered and orchestrated.
//! A unit receives a [`StepContext`] carrying its cancellation token and the
//! shared run context, and returns a [`StepOutput`] or a [`StepError`].
//!
//! Units must stop promptly once [`StepContext::cancellation`] fires and must
//! be safe to run again on retry.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::runner::RunContext;

/// A unit of pipeline work.
#[async_trait]
pub trait StepUnit: Send + Sync {
    /// Run one attempt of the step.
    async fn run(&self, ctx: StepContext) -> Result<StepOutput, StepError>;
}

/// Failure of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepError {
    /// The unit reported a failure.
    #[error("{message}")]
    Failed { message: String },

    /// The attempt exceeded its deadline.
    #[error("timed out after {}ms", .timeout.as_millis())]
    TimedOut {
        #[serde(rename = "timeout_ms", serialize_with = "serialize_millis")]
        timeout: Duration,
    },

    /// The unit panicked.
    #[error("step panicked: {message}")]
    Panicked { message: String },

    /// The run was cancelled while the attempt was in flight.
    #[error("cancelled")]
    Cancelled,
}

impl StepError {
    /// Create a failure with the given message.
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::Failed {
            message: message.into(),
        }
    }

    /// Whether this failure is a deadline overrun.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StepError::TimedOut { .. })
    }
}

impl From<anyhow::Error> for StepError {
    fn from(err: anyhow::Error) -> Self {
        StepError::failed(format!("{:#}", err))
    }
}

impl From<std::io::Error> for StepError {
    fn from(err: std::io::Error) -> Self {
        StepError::failed(err.to_string())
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Value produced by a successful attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepOutput {
    /// Result payload, visible to downstream steps.
    pub data: serde_json::Value,

    /// Number of items the step processed.
    pub items_processed: u64,

    /// Number of items the step could not process.
    pub items_failed: u64,

    /// Non-fatal warnings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl StepOutput {
    /// Output with no payload.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Output carrying the given payload.
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    /// Set item counts.
    pub fn with_items(mut self, processed: u64, failed: u64) -> Self {
        self.items_processed = processed;
        self.items_failed = failed;
        self
    }

    /// Add a warning.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Everything a unit sees during one attempt.
#[derive(Clone)]
pub struct StepContext {
    step: String,
    attempt: u32,
    cancel: CancellationToken,
    run: Arc<RunContext>,
    upstream: Arc<BTreeMap<String, StepOutput>>,
}

impl StepContext {
    /// Create a context for one attempt.
    pub fn new(
        step: impl Into<String>,
        attempt: u32,
        cancel: CancellationToken,
        run: Arc<RunContext>,
        upstream: Arc<BTreeMap<String, StepOutput>>,
    ) -> Self {
        Self {
            step: step.into(),
            attempt,
            cancel,
            run,
            upstream,
        }
    }

    /// Id of the step being run.
    pub fn step_id(&self) -> &str {
        &self.step
    }

    /// 1-based attempt number.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Token that fires when this attempt should stop.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until cancellation is requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Shared run context.
    pub fn run(&self) -> &RunContext {
        &self.run
    }

    /// Output of a step that succeeded in an earlier wave.
    pub fn upstream_output(&self, step: &str) -> Option<&StepOutput> {
        self.upstream.get(step)
    }
}

impl std::fmt::Debug for StepContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("step", &self.step)
            .field("attempt", &self.attempt)
            .field("run_id", &self.run.run_id())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Adapter turning an async closure into a [`StepUnit`].
///
/// ```
/// use pipewave::steps::{FnStep, StepContext, StepError, StepOutput};
///
/// let unit = FnStep::new(|ctx: StepContext| async move {
///     Ok::<_, StepError>(StepOutput::new(serde_json::json!({ "step": ctx.step_id() })))
/// });
/// # let _ = unit;
/// ```
pub struct FnStep<F> {
    f: F,
}

impl<F> FnStep<F> {
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> StepUnit for FnStep<F>
where
    F: Fn(StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<StepOutput, StepError>> + Send,
{
    async fn run(&self, ctx: StepContext) -> Result<StepOutput, StepError> {
        (self.f)(ctx).await
    }
}
