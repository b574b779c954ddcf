//! Pipewave - dependency-aware pipeline step orchestration.
//!
//! Pipewave runs a set of registered steps whose declared dependencies form
//! a directed acyclic graph. Steps are grouped into waves, each wave runs with
//! bounded parallelism, and every step ends with a terminal record in the
//! [`RunReport`].
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, parsing, and validation
//! - [`error`] - Error types and result aliases
//! - [`registry`] - Step registration and lookup
//! - [`runner`] - Dependency graph, waves, scheduling and the run report
//! - [`steps`] - Step definitions, the unit-of-work trait and run records
//! - [`ui`] - Terminal output
//!
//! # Example
//!
//! ```
//! use pipewave::steps::{FnStep, StepContext, StepDefinition, StepError, StepOutput};
//! use pipewave::{run, RunConfig, RunStatus, StepRegistry};
//!
//! let mut registry = StepRegistry::new();
//! registry
//!     .register(
//!         StepDefinition::new("applications"),
//!         FnStep::new(|_ctx: StepContext| async { Ok::<_, StepError>(StepOutput::empty()) }),
//!     )
//!     .unwrap();
//!
//! let config = RunConfig::with_steps(["applications"]);
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let report = runtime.block_on(run(&config, &registry)).unwrap();
//! assert_eq!(report.status, RunStatus::Succeeded);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod registry;
pub mod runner;
pub mod steps;
pub mod ui;

pub use error::{PipewaveError, Result};
pub use registry::StepRegistry;
pub use runner::{run, run_with_events, RunConfig, RunReport, RunStatus};
