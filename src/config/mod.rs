//! Configuration loading, parsing, and validation.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Deep merging in [`merger`]
//! - Validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use pipewave::config::{load_merged_config, validate};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".pipewave");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(
//!     dir.join("config.yml"),
//!     "steps:\n  applications:\n    command: ./bin/extract-applications\n",
//! )
//! .unwrap();
//!
//! let config = load_merged_config(temp.path()).unwrap();
//! validate(&config).unwrap();
//! assert_eq!(config.run_config().enabled_steps, vec!["applications"]);
//! ```
//!
//! # Configuration File Locations
//!
//! Configuration is discovered and merged in this order:
//! 1. User global config (`~/.pipewave/config.yml`)
//! 2. Project config (`.pipewave/config.yml`)
//! 3. Local overrides (`.pipewave/config.local.yml`)

pub mod loader;
pub mod merger;
pub mod schema;
pub mod validator;

pub use loader::{
    find_project_root, load_config, load_config_file, load_config_value, load_merged_config,
    parse_config, project_config_path, ConfigPaths, CONFIG_DIR,
};
pub use merger::{deep_merge, merge_configs};
pub use schema::{ErrorHandlingSettings, PipelineConfig, StepConfig, WorkflowSettings};
pub use validator::{validate, validate_config, ValidationError};
