//! Step execution orchestration.

pub mod context;
pub mod dependency;
pub mod engine;
pub mod events;
pub mod options;
pub mod plan;
pub mod report;
mod scheduler;

pub use context::RunContext;
pub use dependency::{DependencyGraph, DependencyGraphBuilder};
pub use engine::{prepare, run, run_with_events, PreparedRun};
pub use events::{EventSink, FanoutSink, RecordingSink, RunEvent, TracingSink};
pub use options::{DependencyFailurePolicy, RunConfig};
pub use plan::{ExecutionPlan, Wave};
pub use report::{
    AbortReason, ErrorAggregator, ErrorEntry, RunReport, RunStatus, RunSummary, Verdict,
};
