//! Lint command implementation.
//!
//! The `pipewave lint` command validates the configuration and its
//! dependency graph without running anything.

use crate::cli::args::LintArgs;
use crate::config::{validate_config, ValidationError};
use crate::error::Result;
use crate::runner::prepare;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandContext, CommandResult, EXIT_CONFIG_ERROR};

/// Exit code when lint finds problems.
const EXIT_LINT_ERRORS: i32 = 1;

/// The lint command implementation.
pub struct LintCommand {
    context: CommandContext,
    args: LintArgs,
}

impl LintCommand {
    /// Create a new lint command.
    pub fn new(context: CommandContext, args: LintArgs) -> Self {
        Self { context, args }
    }

    fn print_json(&self, ui: &mut dyn UserInterface, errors: &[ValidationError]) -> Result<()> {
        let diagnostics: Vec<serde_json::Value> = errors
            .iter()
            .map(|e| {
                serde_json::json!({
                    "rule": e.rule,
                    "message": e.message,
                    "step": e.step,
                })
            })
            .collect();
        let json = serde_json::to_string_pretty(&diagnostics).map_err(anyhow::Error::from)?;
        ui.message(&json);
        Ok(())
    }
}

impl Command for LintCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = self.context.load(ui)? else {
            return Ok(CommandResult::failure(EXIT_CONFIG_ERROR));
        };

        let errors = validate_config(&config);

        if self.args.json {
            self.print_json(ui, &errors)?;
        } else {
            for error in &errors {
                ui.error(&format!("[{}] {}", error.rule, error.message));
            }
        }

        if !errors.is_empty() {
            if !self.args.json {
                ui.message(&format!("{} problem(s) found", errors.len()));
            }
            return Ok(CommandResult::failure(EXIT_LINT_ERRORS));
        }

        if !self.args.json {
            let registry = config.registry(self.context.project_root())?;
            let prepared = prepare(&config.run_config(), &registry)?;
            ui.success(&format!(
                "Configuration is valid: {} steps in {} waves",
                prepared.plan().step_count(),
                prepared.plan().len()
            ));
        }

        Ok(CommandResult::success())
    }
}
