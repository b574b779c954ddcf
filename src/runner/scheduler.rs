//! Wave-by-wave step execution.
//!
//! Waves run strictly in order. Within a wave every eligible step gets its own
//! management future, and a semaphore caps how many of them hold a slot at
//! once. A slot is held across all attempts of a step, so retries reuse it.
//!
//! Each attempt runs the unit in a spawned task under a deadline. When the
//! deadline passes, the attempt's cancellation token fires and the task is
//! detached: its late result is never observed.
//!
//! Two tokens govern a run:
//! - `halt` stops later waves and further retries once an abort is decided.
//!   Members of the wave in progress still get a slot and run.
//! - `cancel` is the parent of every attempt token and fires only when the
//!   circuit breaker trips. Members still waiting for a slot are skipped.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::context::RunContext;
use super::dependency::DependencyGraph;
use super::events::{EventSink, RunEvent};
use super::options::{DependencyFailurePolicy, RunConfig};
use super::plan::ExecutionPlan;
use super::report::{AbortReason, ErrorAggregator, RunReport, Verdict};
use crate::steps::{
    SkipReason, StepContext, StepError, StepOutput, StepRunRecord, StepStatus, StepUnit,
};

/// A step resolved for execution.
#[derive(Clone)]
pub(crate) struct ScheduledStep {
    pub(crate) unit: Arc<dyn StepUnit>,
    pub(crate) timeout: Duration,
    pub(crate) retries: u32,
}

pub(crate) struct Scheduler {
    run: Arc<RunContext>,
    sink: Arc<dyn EventSink>,
    slots: Semaphore,
    halt: CancellationToken,
    cancel: CancellationToken,
    config: RunConfig,
}

impl Scheduler {
    pub(crate) fn new(config: &RunConfig, run: Arc<RunContext>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            run,
            sink,
            slots: Semaphore::new(config.max_parallel_steps.max(1)),
            halt: CancellationToken::new(),
            cancel: CancellationToken::new(),
            config: config.clone(),
        }
    }

    #[instrument(name = "run", skip_all, fields(run_id = %self.run.run_id()))]
    pub(crate) async fn execute(
        &self,
        graph: &DependencyGraph,
        plan: &ExecutionPlan,
        steps: &BTreeMap<String, ScheduledStep>,
    ) -> RunReport {
        let mut aggregator = ErrorAggregator::new(
            &self.run,
            self.config.continue_on_error,
            self.config.max_failed_steps,
            plan.to_groups(),
        );

        self.sink.emit(&RunEvent::RunStarted {
            run_id: self.run.run_id(),
            steps: plan.step_count(),
            waves: plan.len(),
        });

        for wave in plan {
            if self.halt.is_cancelled() {
                for id in &wave.steps {
                    let record = StepRunRecord::pending(id).skip(SkipReason::RunAborted);
                    self.finish(&mut aggregator, record);
                }
                continue;
            }

            self.sink.emit(&RunEvent::WaveStarted {
                index: wave.index,
                steps: wave.steps.clone(),
            });

            let upstream = Arc::new(aggregator.outputs());
            let mut running = FuturesUnordered::new();

            for id in &wave.steps {
                if let Some(reason) = self.blocked_by(id, graph, &aggregator) {
                    self.finish(&mut aggregator, StepRunRecord::pending(id).skip(reason));
                    continue;
                }
                running.push(self.run_step(id, &steps[id], Arc::clone(&upstream)));
            }

            while let Some(record) = running.next().await {
                self.finish(&mut aggregator, record);
            }
        }

        let report = aggregator.finish();
        self.sink.emit(&RunEvent::RunFinished {
            run_id: report.run_id,
            status: report.status,
            duration: report.duration(),
        });
        report
    }

    /// Hand a terminal record to the aggregator and act on its verdict.
    fn finish(&self, aggregator: &mut ErrorAggregator, record: StepRunRecord) {
        self.sink.emit(&RunEvent::StepFinished {
            record: record.clone(),
        });

        if let Verdict::Halt(reason) = aggregator.record(record) {
            warn!(%reason, "halting run");
            self.halt.cancel();
            if matches!(reason, AbortReason::CircuitBreaker { .. }) {
                self.cancel.cancel();
            }
        }
    }

    /// First dependency that keeps `step` from running, if any.
    fn blocked_by(
        &self,
        step: &str,
        graph: &DependencyGraph,
        aggregator: &ErrorAggregator,
    ) -> Option<SkipReason> {
        if self.config.on_dependency_failure == DependencyFailurePolicy::RunAnyway {
            return None;
        }

        graph
            .dependencies_of(step)
            .into_iter()
            .flatten()
            .find_map(|dep| {
                let status = aggregator.status_of(dep).unwrap_or(StepStatus::Pending);
                (status != StepStatus::Succeeded).then(|| SkipReason::DependencyNotSucceeded {
                    dependency: dep.clone(),
                    status,
                })
            })
    }

    /// Drive one step through all of its attempts.
    async fn run_step(
        &self,
        id: &str,
        step: &ScheduledStep,
        upstream: Arc<BTreeMap<String, StepOutput>>,
    ) -> StepRunRecord {
        let mut record = StepRunRecord::pending(id);

        let _slot = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return record.skip(SkipReason::RunAborted),
            slot = self.slots.acquire() => match slot {
                Ok(slot) => slot,
                Err(_) => return record.skip(SkipReason::RunAborted),
            },
        };

        loop {
            record.start_attempt();
            let attempt = record.attempts();
            self.sink.emit(&RunEvent::StepStarted {
                step: id.to_string(),
                attempt,
            });

            let error = match self.attempt(id, attempt, step, Arc::clone(&upstream)).await {
                Ok(output) => return record.succeed(output),
                Err(error) => error,
            };

            if attempt > step.retries || self.halt.is_cancelled() || error == StepError::Cancelled {
                return record.fail(error);
            }

            self.sink.emit(&RunEvent::StepRetrying {
                step: id.to_string(),
                attempt,
                error: error.clone(),
            });
            record.attempt_failed(error);
        }
    }

    /// Run a single attempt under its deadline.
    #[instrument(name = "step", skip(self, step, upstream), fields(timeout_ms = step.timeout.as_millis() as u64))]
    async fn attempt(
        &self,
        id: &str,
        attempt: u32,
        step: &ScheduledStep,
        upstream: Arc<BTreeMap<String, StepOutput>>,
    ) -> Result<StepOutput, StepError> {
        let token = self.cancel.child_token();
        let ctx = StepContext::new(id, attempt, token.clone(), Arc::clone(&self.run), upstream);
        let unit = Arc::clone(&step.unit);
        let handle = tokio::spawn(async move { unit.run(ctx).await });

        tokio::select! {
            biased;
            joined = handle => match joined {
                Ok(result) => result,
                Err(err) if err.is_panic() => Err(StepError::Panicked {
                    message: panic_message(err.into_panic()),
                }),
                Err(_) => Err(StepError::Cancelled),
            },
            _ = tokio::time::sleep(step.timeout) => {
                debug!("deadline passed, cancelling attempt");
                token.cancel();
                Err(StepError::TimedOut { timeout: step.timeout })
            }
            _ = self.cancel.cancelled() => {
                debug!("run cancelled, abandoning attempt");
                Err(StepError::Cancelled)
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_str_and_string() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "unknown panic payload");
    }
}
