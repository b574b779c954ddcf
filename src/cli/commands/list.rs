//! List command implementation.
//!
//! The `pipewave list` command lists configured steps.

use crate::cli::args::ListArgs;
use crate::error::Result;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandContext, CommandResult, EXIT_CONFIG_ERROR};

/// The list command implementation.
pub struct ListCommand {
    context: CommandContext,
    args: ListArgs,
}

impl ListCommand {
    /// Create a new list command.
    pub fn new(context: CommandContext, args: ListArgs) -> Self {
        Self { context, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &ListArgs {
        &self.args
    }
}

impl Command for ListCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = self.context.load(ui)? else {
            return Ok(CommandResult::failure(EXIT_CONFIG_ERROR));
        };
        let enabled = config.enabled_steps();

        if self.args.json {
            let steps: Vec<serde_json::Value> = config
                .steps
                .iter()
                .map(|(id, step)| {
                    serde_json::json!({
                        "id": id,
                        "description": step.description,
                        "command": step.command,
                        "depends_on": step.depends_on,
                        "enabled": enabled.contains(id),
                    })
                })
                .collect();
            let json = serde_json::to_string_pretty(&steps).map_err(anyhow::Error::from)?;
            ui.message(&json);
            return Ok(CommandResult::success());
        }

        let title = config.name.as_deref().unwrap_or("pipeline");
        ui.show_header(&format!("{} ({} steps)", title, config.steps.len()));

        for (id, step) in &config.steps {
            let mut line = format!("  {}", id);
            if let Some(description) = &step.description {
                line.push_str(&format!(" - {}", description));
            }
            if !enabled.contains(id) {
                line.push_str(" (disabled)");
            }
            ui.message(&line);

            if let Some(command) = &step.command {
                ui.message(&format!("      run: {}", command));
            }
            if !step.depends_on.is_empty() {
                ui.message(&format!("      after: {}", step.depends_on.join(", ")));
            }
        }

        Ok(CommandResult::success())
    }
}
