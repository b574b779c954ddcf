//! Run entry points.
//!
//! [`prepare`] resolves a run configuration against a registry and rejects
//! every configuration problem before anything executes. [`run`] prepares and
//! then executes, returning the run report.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::context::RunContext;
use super::dependency::DependencyGraph;
use super::events::{EventSink, TracingSink};
use super::options::RunConfig;
use super::plan::ExecutionPlan;
use super::report::RunReport;
use super::scheduler::{ScheduledStep, Scheduler};
use crate::error::{PipewaveError, Result};
use crate::registry::StepRegistry;
use crate::steps::StepDefinition;

/// A validated run, ready to execute.
pub struct PreparedRun {
    config: RunConfig,
    definitions: Vec<StepDefinition>,
    graph: DependencyGraph,
    plan: ExecutionPlan,
    steps: BTreeMap<String, ScheduledStep>,
}

impl PreparedRun {
    /// The run policy.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Enabled step definitions with dependency overrides applied.
    pub fn definitions(&self) -> &[StepDefinition] {
        &self.definitions
    }

    /// The validated dependency graph.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// The execution waves.
    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// Execute the run.
    pub async fn execute(&self, sink: Arc<dyn EventSink>) -> RunReport {
        let run = Arc::new(RunContext::new(self.config.continue_on_item_error));
        Scheduler::new(&self.config, run, sink)
            .execute(&self.graph, &self.plan, &self.steps)
            .await
    }
}

impl std::fmt::Debug for PreparedRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedRun")
            .field("config", &self.config)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

/// Validate `config` against `registry` and build the execution plan.
///
/// Fails with a configuration error if the policy is out of range, an enabled
/// or overridden id is unknown, a dependency is not enabled, or the
/// dependencies form a cycle.
pub fn prepare(config: &RunConfig, registry: &StepRegistry) -> Result<PreparedRun> {
    config.validate()?;

    if let Some(id) = config
        .step_dependencies
        .keys()
        .find(|id| !registry.contains(id))
    {
        return Err(PipewaveError::UnknownStep { id: id.clone() });
    }

    let enabled = registry.get_enabled(&config.enabled_steps)?;

    if let Some(step) = enabled
        .iter()
        .map(|step| step.definition())
        .find(|def| def.timeout.is_some_and(|timeout| timeout.is_zero()))
    {
        return Err(PipewaveError::ConfigValidationError {
            message: format!("step '{}' has a zero timeout", step.id),
        });
    }

    let definitions: Vec<StepDefinition> = enabled
        .iter()
        .map(|step| {
            let mut def = step.definition().clone();
            if let Some(deps) = config.step_dependencies.get(&def.id) {
                def.depends_on = deps.clone();
            }
            def
        })
        .collect();

    let graph = DependencyGraph::build(&definitions)?;
    let plan = graph.topological_waves();

    let steps = enabled
        .iter()
        .map(|step| {
            let def = step.definition();
            let scheduled = ScheduledStep {
                unit: step.unit(),
                timeout: def.effective_timeout(config.default_timeout),
                retries: def.effective_retries(config.retry_failed_steps, config.max_retries),
            };
            (def.id.clone(), scheduled)
        })
        .collect();

    debug!(
        steps = definitions.len(),
        waves = plan.len(),
        "prepared run"
    );

    Ok(PreparedRun {
        config: config.clone(),
        definitions,
        graph,
        plan,
        steps,
    })
}

/// Run the enabled steps of `registry` under `config`.
///
/// Returns `Err` only for configuration errors, before any step runs. Step
/// failures are reported in the [`RunReport`].
pub async fn run(config: &RunConfig, registry: &StepRegistry) -> Result<RunReport> {
    run_with_events(config, registry, Arc::new(TracingSink)).await
}

/// Like [`run`], publishing lifecycle events to `sink`.
pub async fn run_with_events(
    config: &RunConfig,
    registry: &StepRegistry,
    sink: Arc<dyn EventSink>,
) -> Result<RunReport> {
    let prepared = prepare(config, registry)?;
    Ok(prepared.execute(sink).await)
}
