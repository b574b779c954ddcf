//! Error types for Pipewave operations.
//!
//! This module defines [`PipewaveError`], the error type returned before any
//! step runs, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Configuration problems (unknown steps, missing dependencies, cycles)
//!   are `PipewaveError`s and abort a run before it starts
//! - Failures raised by a step's unit of work are [`StepError`]s; they are
//!   recorded in the run report and never returned from `run`
//! - Use `anyhow::Error` (via `PipewaveError::Other`) for unexpected errors
//!
//! [`StepError`]: crate::steps::StepError

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Pipewave operations.
#[derive(Debug, Error)]
pub enum PipewaveError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// A step with the same id was registered twice.
    #[error("Step '{id}' is already registered")]
    DuplicateStep { id: String },

    /// An enabled or referenced step id was never registered.
    #[error("Unknown step: {id}")]
    UnknownStep { id: String },

    /// A step depends on a step that is not part of the run.
    #[error("Step '{step}' depends on '{dependency}' which is not enabled")]
    MissingDependency { step: String, dependency: String },

    /// Step dependency cycle detected.
    #[error("Circular dependency detected: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipewaveError {
    /// Whether this error belongs to the configuration group.
    ///
    /// Configuration errors are always fatal and raised before execution.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            PipewaveError::ConfigNotFound { .. }
                | PipewaveError::ConfigParseError { .. }
                | PipewaveError::ConfigValidationError { .. }
                | PipewaveError::DuplicateStep { .. }
                | PipewaveError::UnknownStep { .. }
                | PipewaveError::MissingDependency { .. }
                | PipewaveError::CyclicDependency { .. }
        )
    }
}

/// Result type alias for Pipewave operations.
pub type Result<T> = std::result::Result<T, PipewaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_displays_path() {
        let err = PipewaveError::ConfigNotFound {
            path: PathBuf::from("/foo/config.yml"),
        };
        assert!(err.to_string().contains("/foo/config.yml"));
    }

    #[test]
    fn config_parse_error_displays_path_and_message() {
        let err = PipewaveError::ConfigParseError {
            path: PathBuf::from("/config.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/config.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn duplicate_step_displays_id() {
        let err = PipewaveError::DuplicateStep {
            id: "applications".into(),
        };
        assert!(err.to_string().contains("applications"));
    }

    #[test]
    fn missing_dependency_names_both_steps() {
        let err = PipewaveError::MissingDependency {
            step: "sdc_template".into(),
            dependency: "popularity_codes".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sdc_template"));
        assert!(msg.contains("popularity_codes"));
    }

    #[test]
    fn circular_dependency_displays_cycle() {
        let err = PipewaveError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn configuration_errors_are_classified() {
        assert!(PipewaveError::UnknownStep { id: "x".into() }.is_configuration_error());
        assert!(PipewaveError::CyclicDependency { cycle: vec![] }.is_configuration_error());

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: PipewaveError = io_err.into();
        assert!(matches!(err, PipewaveError::Io(_)));
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn result_type_alias_works() {
        fn returns_error() -> Result<()> {
            Err(PipewaveError::ConfigValidationError {
                message: "test".into(),
            })
        }
        assert!(returns_error().is_err());
    }
}
