//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandContext`] carrying the project location and global flags
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands, RunArgs};
use crate::config::{load_config, PipelineConfig};
use crate::error::{PipewaveError, Result};
use crate::ui::UserInterface;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command.
    ///
    /// # Arguments
    ///
    /// * `ui` - User interface for displaying output
    ///
    /// # Returns
    ///
    /// A [`CommandResult`] indicating success/failure and exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Exit code for a run that did not fully succeed.
pub const EXIT_RUN_FAILED: i32 = 1;

/// Exit code for configuration problems.
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Where the project lives and how to present output.
#[derive(Debug, Clone)]
pub struct CommandContext {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
    no_color: bool,
}

impl CommandContext {
    /// Create a context for `project_root`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            config_path: None,
            no_color: false,
        }
    }

    /// Load this config file instead of discovering one.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Disable colored output.
    pub fn with_no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Whether colors are disabled.
    pub fn no_color(&self) -> bool {
        self.no_color
    }

    /// Load the pipeline configuration.
    ///
    /// Reports a missing configuration through `ui` and returns `None`.
    pub fn load(&self, ui: &mut dyn UserInterface) -> Result<Option<PipelineConfig>> {
        match load_config(&self.project_root, self.config_path.as_deref()) {
            Ok(config) => Ok(Some(config)),
            Err(PipewaveError::ConfigNotFound { path }) => {
                ui.error(&format!(
                    "No configuration found at {}. Create .pipewave/config.yml first.",
                    path.display()
                ));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    context: CommandContext,
}

impl CommandDispatcher {
    /// Create a new dispatcher.
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        self.context.project_root()
    }

    /// Dispatch and execute a command.
    ///
    /// Routes the CLI subcommand to the appropriate command implementation
    /// and executes it.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let context = self.context.clone();
        match &cli.command {
            Some(Commands::Run(args)) => super::run::RunCommand::new(context, args.clone()).execute(ui),
            Some(Commands::Plan(args)) => {
                super::plan::PlanCommand::new(context, args.clone()).execute(ui)
            }
            Some(Commands::List(args)) => {
                super::list::ListCommand::new(context, args.clone()).execute(ui)
            }
            Some(Commands::Lint(args)) => {
                super::lint::LintCommand::new(context, args.clone()).execute(ui)
            }
            Some(Commands::Completions(args)) => {
                super::completions::CompletionsCommand::new(args.clone()).execute(ui)
            }
            None => super::run::RunCommand::new(context, RunArgs::default()).execute(ui),
        }
    }
}
