//! Plan command implementation.
//!
//! The `pipewave plan` command shows the execution waves without running
//! any step.

use crate::cli::args::PlanArgs;
use crate::error::Result;
use crate::ui::{render_plan, UserInterface};

use super::dispatcher::{Command, CommandContext, CommandResult, EXIT_CONFIG_ERROR};
use super::run::prepare_pipeline;

/// The plan command implementation.
pub struct PlanCommand {
    context: CommandContext,
    args: PlanArgs,
}

impl PlanCommand {
    /// Create a new plan command.
    pub fn new(context: CommandContext, args: PlanArgs) -> Self {
        Self { context, args }
    }
}

impl Command for PlanCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let Some(config) = self.context.load(ui)? else {
            return Ok(CommandResult::failure(EXIT_CONFIG_ERROR));
        };

        let mut run_config = config.run_config();
        if !self.args.steps.is_empty() {
            run_config.enabled_steps = self.args.steps.clone();
        }

        let prepared = prepare_pipeline(&config, &run_config, self.context.project_root())?;

        if self.args.json {
            let json =
                serde_json::to_string_pretty(prepared.plan()).map_err(anyhow::Error::from)?;
            ui.message(&json);
        } else {
            render_plan(ui, &prepared);
        }

        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    const PIPELINE: &str = r#"
steps:
  applications:
    command: "true"
  marketing_descriptions:
    command: "true"
  popularity_codes:
    command: "true"
  sdc_template:
    command: "true"
    depends_on: [marketing_descriptions, popularity_codes]
  validation_reports:
    command: "true"
    depends_on: [applications, marketing_descriptions]
"#;

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".pipewave");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.yml"), PIPELINE).unwrap();
        temp
    }

    #[test]
    fn plan_renders_waves() {
        let temp = project();
        let mut ui = MockUI::new();

        let result = PlanCommand::new(CommandContext::new(temp.path()), PlanArgs::default())
            .execute(&mut ui)
            .unwrap();

        assert!(result.success);
        assert_eq!(ui.headers(), ["5 steps in 2 waves"]);
        assert!(ui.messages().iter().any(|m| m == "Wave 2:"));
    }

    #[test]
    fn plan_json_lists_groups() {
        let temp = project();
        let mut ui = MockUI::new();

        PlanCommand::new(
            CommandContext::new(temp.path()),
            PlanArgs {
                json: true,
                ..Default::default()
            },
        )
        .execute(&mut ui)
        .unwrap();

        let waves: serde_json::Value = serde_json::from_str(&ui.messages()[0]).unwrap();
        assert_eq!(
            waves[1]["steps"],
            serde_json::json!(["sdc_template", "validation_reports"])
        );
    }

    #[test]
    fn plan_with_missing_dependency_fails() {
        let temp = project();
        let mut ui = MockUI::new();

        let err = PlanCommand::new(
            CommandContext::new(temp.path()),
            PlanArgs {
                steps: vec!["sdc_template".into()],
                ..Default::default()
            },
        )
        .execute(&mut ui)
        .unwrap_err();

        assert!(err.is_configuration_error());
    }
}
