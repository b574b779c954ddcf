//! Per-run shared context.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// State shared by every unit of one run.
///
/// Created when a run starts and dropped when its report is returned; no
/// state survives between runs.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    continue_on_item_error: bool,
}

impl RunContext {
    /// Create a context with a fresh run id.
    pub fn new(continue_on_item_error: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            continue_on_item_error,
        }
    }

    /// Unique id of this run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// When the run started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether a unit should keep going after an individual item fails.
    ///
    /// Units that process many records use this to decide between skipping
    /// a bad record and failing the whole step.
    pub fn continue_on_item_error(&self) -> bool {
        self.continue_on_item_error
    }
}
