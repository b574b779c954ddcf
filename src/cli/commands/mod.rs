//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations. This allows:
//! - Single binary with subcommands (`pipewave run`, `pipewave plan`)
//! - Shared configuration loading through [`CommandContext`]
//! - Consistent global flag handling

pub mod completions;
pub mod dispatcher;
pub mod lint;
pub mod list;
pub mod plan;
pub mod run;

pub use dispatcher::{
    Command, CommandContext, CommandDispatcher, CommandResult, EXIT_CONFIG_ERROR,
    EXIT_RUN_FAILED,
};
