//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Pipewave - dependency-aware pipeline step orchestration.
#[derive(Debug, Parser)]
#[command(name = "pipewave")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides default .pipewave/config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Show every attempt and retry
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show only the summary
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the pipeline (default if no command specified)
    Run(RunArgs),

    /// Show the execution waves without running anything
    Plan(PlanArgs),

    /// List configured steps
    List(ListArgs),

    /// Validate configuration and the dependency graph
    Lint(LintArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Run only these steps (comma-separated, replaces enabled_steps)
    #[arg(long, value_delimiter = ',')]
    pub steps: Vec<String>,

    /// Override max_parallel_steps
    #[arg(long, value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Abort on the first failed step
    #[arg(long)]
    pub fail_fast: bool,

    /// Print the run report as JSON instead of progress output
    #[arg(long)]
    pub json: bool,

    /// Write the run report as JSON to a file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

/// Arguments for the `plan` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PlanArgs {
    /// Plan only these steps (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub steps: Vec<String>,

    /// Output waves as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `lint` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct LintArgs {
    /// Output diagnostics as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_step_list() {
        let cli = Cli::parse_from([
            "pipewave",
            "run",
            "--steps",
            "applications,popularity_codes",
            "--max-parallel",
            "2",
            "--fail-fast",
        ]);
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.steps, ["applications", "popularity_codes"]);
        assert_eq!(args.max_parallel, Some(2));
        assert!(args.fail_fast);
        assert!(!args.json);
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::parse_from(["pipewave"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["pipewave", "plan", "--no-color", "-q"]);
        assert!(cli.no_color);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Some(Commands::Plan(_))));
    }

    #[test]
    fn parses_completions_shell() {
        let cli = Cli::parse_from(["pipewave", "completions", "zsh"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Completions(CompletionsArgs { shell: Shell::Zsh }))
        ));
    }
}
