//! Run command implementation.
//!
//! The `pipewave run` command executes the configured pipeline.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::cli::args::RunArgs;
use crate::config::{validate, PipelineConfig};
use crate::error::Result;
use crate::runner::{prepare, EventSink, FanoutSink, PreparedRun, RunConfig, TracingSink};
use crate::ui::{render_report, ConsoleSink, UserInterface};

use super::dispatcher::{
    Command, CommandContext, CommandResult, EXIT_CONFIG_ERROR, EXIT_RUN_FAILED,
};

/// The run command implementation.
pub struct RunCommand {
    context: CommandContext,
    args: RunArgs,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(context: CommandContext, args: RunArgs) -> Self {
        Self { context, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    /// Run policy with the command-line overrides applied.
    fn run_config(&self, config: &PipelineConfig) -> RunConfig {
        let mut run_config = config.run_config();
        if !self.args.steps.is_empty() {
            run_config.enabled_steps = self.args.steps.clone();
        }
        if let Some(max_parallel) = self.args.max_parallel {
            run_config.max_parallel_steps = max_parallel;
        }
        if self.args.fail_fast {
            run_config.continue_on_error = false;
        }
        run_config
    }

    fn sink(&self, ui: &dyn UserInterface) -> Arc<dyn EventSink> {
        if self.args.json {
            return Arc::new(TracingSink);
        }
        let sinks: Vec<Arc<dyn EventSink>> = vec![
            Arc::new(TracingSink),
            Arc::new(ConsoleSink::new(ui.output_mode(), self.context.no_color())),
        ];
        Arc::new(FanoutSink::new(sinks))
    }
}

/// Validate `config` and resolve it into an executable run.
pub(super) fn prepare_pipeline(
    config: &PipelineConfig,
    run_config: &RunConfig,
    project_root: &Path,
) -> Result<PreparedRun> {
    validate(config)?;
    let registry = config.registry(project_root)?;
    prepare(run_config, &registry)
}

impl Command for RunCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = self.context.load(ui)? else {
            return Ok(CommandResult::failure(EXIT_CONFIG_ERROR));
        };

        let run_config = self.run_config(&config);
        let prepared = prepare_pipeline(&config, &run_config, self.context.project_root())?;
        debug!(plan = ?prepared.plan().to_groups(), "pipeline prepared");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let report = runtime.block_on(prepared.execute(self.sink(ui)));

        if self.args.json || self.args.report.is_some() {
            let json = serde_json::to_string_pretty(&report).map_err(anyhow::Error::from)?;
            if let Some(path) = &self.args.report {
                std::fs::write(path, &json)?;
                debug!(path = %path.display(), "report written");
            }
            if self.args.json {
                ui.message(&json);
            }
        }

        if !self.args.json {
            render_report(ui, &report);
        }

        if report.is_success() {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(EXIT_RUN_FAILED))
        }
    }
}
