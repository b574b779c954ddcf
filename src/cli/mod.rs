//! Command-line interface for Pipewave.
//!
//! This module provides the CLI argument parsing using clap's derive macros
//! and command implementations.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, CompletionsArgs, LintArgs, ListArgs, PlanArgs, RunArgs};
pub use commands::{
    Command, CommandContext, CommandDispatcher, CommandResult, EXIT_CONFIG_ERROR,
    EXIT_RUN_FAILED,
};
