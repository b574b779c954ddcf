//! Run lifecycle events.
//!
//! The scheduler publishes a [`RunEvent`] at every state change. Sinks are
//! called from the scheduler's task and must not block.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::report::RunStatus;
use crate::steps::{StepError, StepRunRecord, StepStatus};

/// Something that happened during a run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: Uuid,
        steps: usize,
        waves: usize,
    },
    WaveStarted {
        index: usize,
        steps: Vec<String>,
    },
    StepStarted {
        step: String,
        attempt: u32,
    },
    /// An attempt failed and another will follow.
    StepRetrying {
        step: String,
        attempt: u32,
        error: StepError,
    },
    /// A step reached its terminal state.
    StepFinished { record: StepRunRecord },
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
        #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
        duration: Duration,
    },
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Receiver of run events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RunEvent);
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted {
                run_id,
                steps,
                waves,
            } => info!(%run_id, steps, waves, "run_started"),
            RunEvent::WaveStarted { index, steps } => {
                debug!(wave = index, steps = ?steps, "wave_started")
            }
            RunEvent::StepStarted { step, attempt } => debug!(%step, attempt, "step_started"),
            RunEvent::StepRetrying {
                step,
                attempt,
                error,
            } => warn!(%step, attempt, %error, "step_retrying"),
            RunEvent::StepFinished { record } => {
                let step = record.step();
                let attempts = record.attempts();
                match record.status() {
                    StepStatus::Succeeded => info!(step, attempts, "step_succeeded"),
                    StepStatus::TimedOut => warn!(
                        step,
                        attempts,
                        error = %display_error(record),
                        "step_timed_out"
                    ),
                    StepStatus::Skipped => info!(
                        step,
                        reason = %record.skip_reason().map(ToString::to_string).unwrap_or_default(),
                        "step_skipped"
                    ),
                    _ => warn!(
                        step,
                        attempts,
                        error = %display_error(record),
                        "step_failed"
                    ),
                }
            }
            RunEvent::RunFinished {
                run_id,
                status,
                duration,
            } => info!(
                %run_id,
                %status,
                duration_ms = duration.as_millis() as u64,
                "run_finished"
            ),
        }
    }
}

fn display_error(record: &StepRunRecord) -> String {
    record.error().map(ToString::to_string).unwrap_or_default()
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Forwards events to several sinks in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &RunEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
