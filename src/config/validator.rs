//! Configuration validation rules.
//!
//! - Steps must have a command
//! - Dependencies and overrides must reference existing steps
//! - Enabled steps must exist, appear once, and have their dependencies enabled
//! - Policy values must be in range
//! - No circular dependencies

use std::collections::{BTreeMap, HashSet};

use crate::config::schema::PipelineConfig;
use crate::error::{PipewaveError, Result};
use crate::runner::DependencyGraph;

/// Validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
    /// Step id if the error is step-specific
    pub step: Option<String>,
}

impl ValidationError {
    fn new(rule: &str, message: String, step: Option<&str>) -> Self {
        Self {
            rule: rule.to_string(),
            message,
            step: step.map(str::to_string),
        }
    }
}

/// Validate a configuration and return every problem found.
pub fn validate_config(config: &PipelineConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_policy(config));
    errors.extend(validate_steps(config));
    errors.extend(validate_enabled(config));
    errors.extend(validate_cycles(config));

    errors
}

fn validate_policy(config: &PipelineConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let workflow = &config.workflow;

    if workflow.max_parallel_steps == 0 {
        errors.push(ValidationError::new(
            "invalid-parallelism",
            "workflow.max_parallel_steps must be at least 1".to_string(),
            None,
        ));
    }
    if workflow.default_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "invalid-timeout",
            "workflow.default_timeout_secs must be greater than zero".to_string(),
            None,
        ));
    }

    errors
}

fn validate_steps(config: &PipelineConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (id, step) in &config.steps {
        if step.command.as_deref().map_or(true, |c| c.trim().is_empty()) {
            errors.push(ValidationError::new(
                "missing-command",
                format!("Step '{}' must have a command", id),
                Some(id.as_str()),
            ));
        }

        if step.timeout_secs == Some(0) {
            errors.push(ValidationError::new(
                "invalid-timeout",
                format!("Step '{}' has a zero timeout", id),
                Some(id.as_str()),
            ));
        }

        if step.depends_on.iter().any(|d| d == id) {
            errors.push(ValidationError::new(
                "self-dependency",
                format!("Step '{}' depends on itself", id),
                Some(id.as_str()),
            ));
        }
    }

    for (id, deps) in effective_dependencies(config) {
        for dep in deps {
            if !config.steps.contains_key(dep) {
                errors.push(ValidationError::new(
                    "unknown-step",
                    format!("Step '{}' depends on '{}' which does not exist", id, dep),
                    Some(id),
                ));
            }
        }
    }

    for id in config.workflow.step_dependencies.keys() {
        if !config.steps.contains_key(id) {
            errors.push(ValidationError::new(
                "unknown-override-step",
                format!("step_dependencies has an entry for '{}' which does not exist", id),
                Some(id.as_str()),
            ));
        }
    }

    errors
}

fn validate_enabled(config: &PipelineConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let enabled = config.enabled_steps();
    let mut seen = HashSet::new();

    for id in &enabled {
        if !seen.insert(id.as_str()) {
            errors.push(ValidationError::new(
                "duplicate-enabled-step",
                format!("Step '{}' is enabled more than once", id),
                Some(id.as_str()),
            ));
        }
        if !config.steps.contains_key(id) {
            errors.push(ValidationError::new(
                "unknown-enabled-step",
                format!("Enabled step '{}' does not exist", id),
                Some(id.as_str()),
            ));
        }
    }

    let deps = effective_dependencies(config);
    for id in &enabled {
        for dep in deps.get(id.as_str()).into_iter().flatten() {
            if config.steps.contains_key(*dep) && !seen.contains(*dep) {
                errors.push(ValidationError::new(
                    "disabled-dependency",
                    format!("Step '{}' depends on '{}' which is not enabled", id, dep),
                    Some(id.as_str()),
                ));
            }
        }
    }

    errors
}

fn validate_cycles(config: &PipelineConfig) -> Vec<ValidationError> {
    let builder = effective_dependencies(config)
        .into_iter()
        .fold(DependencyGraph::builder(), |builder, (id, deps)| {
            let known = deps.into_iter().filter(|d| config.steps.contains_key(*d));
            builder.add_step(id, known)
        });

    match builder.build() {
        Err(PipewaveError::CyclicDependency { cycle }) => vec![ValidationError::new(
            "circular-dependency",
            format!("Circular dependency detected: {}", cycle.join(" -> ")),
            cycle.first().map(String::as_str),
        )],
        _ => Vec::new(),
    }
}

/// Dependencies of every configured step, with overrides applied.
fn effective_dependencies(config: &PipelineConfig) -> BTreeMap<&str, Vec<&str>> {
    config
        .steps
        .iter()
        .map(|(id, step)| {
            let deps = config
                .workflow
                .step_dependencies
                .get(id)
                .unwrap_or(&step.depends_on);
            (id.as_str(), deps.iter().map(String::as_str).collect())
        })
        .collect()
}

/// Validate and return the first problems as one error.
///
/// # Errors
///
/// Returns `ConfigValidationError` if any validation rules fail.
pub fn validate(config: &PipelineConfig) -> Result<()> {
    let errors = validate_config(config);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        Err(PipewaveError::ConfigValidationError {
            message: messages.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StepConfig;

    fn step(command: &str, deps: &[&str]) -> StepConfig {
        StepConfig {
            command: Some(command.to_string()),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    fn config(steps: &[(&str, &[&str])]) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        for (id, deps) in steps {
            config.steps.insert(id.to_string(), step("true", deps));
        }
        config
    }

    fn rules(config: &PipelineConfig) -> Vec<String> {
        validate_config(config).into_iter().map(|e| e.rule).collect()
    }

    #[test]
    fn valid_pipeline_has_no_errors() {
        let config = config(&[
            ("applications", &[]),
            ("marketing_descriptions", &[]),
            ("popularity_codes", &[]),
            ("sdc_template", &["marketing_descriptions", "popularity_codes"]),
            ("validation_reports", &["applications", "marketing_descriptions"]),
        ]);
        assert!(validate_config(&config).is_empty());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn step_without_command() {
        let mut config = PipelineConfig::default();
        config.steps.insert("empty".into(), StepConfig::default());
        assert!(rules(&config).contains(&"missing-command".to_string()));
    }

    #[test]
    fn unknown_dependency() {
        let config = config(&[("a", &["ghost"])]);
        assert!(rules(&config).contains(&"unknown-step".to_string()));
    }

    #[test]
    fn self_dependency() {
        let config = config(&[("a", &["a"])]);
        let rules = rules(&config);
        assert!(rules.contains(&"self-dependency".to_string()));
        assert!(rules.contains(&"circular-dependency".to_string()));
    }

    #[test]
    fn circular_dependency_names_path() {
        let config = config(&[("a", &["b"]), ("b", &["a"])]);
        let errors = validate_config(&config);
        let cycle = errors
            .iter()
            .find(|e| e.rule == "circular-dependency")
            .unwrap();
        assert!(cycle.message.contains("a -> b -> a"));
    }

    #[test]
    fn unknown_enabled_step() {
        let mut config = config(&[("a", &[])]);
        config.workflow.enabled_steps = Some(vec!["a".into(), "ghost".into()]);
        assert!(rules(&config).contains(&"unknown-enabled-step".to_string()));
    }

    #[test]
    fn duplicate_enabled_step() {
        let mut config = config(&[("a", &[])]);
        config.workflow.enabled_steps = Some(vec!["a".into(), "a".into()]);
        assert!(rules(&config).contains(&"duplicate-enabled-step".to_string()));
    }

    #[test]
    fn dependency_must_be_enabled() {
        let mut config = config(&[("a", &[]), ("b", &["a"])]);
        config.workflow.enabled_steps = Some(vec!["b".into()]);
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "disabled-dependency");
        assert_eq!(errors[0].step.as_deref(), Some("b"));
    }

    #[test]
    fn override_replaces_declared_dependencies() {
        let mut config = config(&[("a", &[]), ("b", &["a"])]);
        config.workflow.enabled_steps = Some(vec!["b".into()]);
        config
            .workflow
            .step_dependencies
            .insert("b".into(), Vec::new());
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn override_for_unknown_step() {
        let mut config = config(&[("a", &[])]);
        config
            .workflow
            .step_dependencies
            .insert("ghost".into(), vec!["a".into()]);
        assert!(rules(&config).contains(&"unknown-override-step".to_string()));
    }

    #[test]
    fn zero_parallelism_and_timeout() {
        let mut config = config(&[("a", &[])]);
        config.workflow.max_parallel_steps = 0;
        config.workflow.default_timeout_secs = 0;
        let rules = rules(&config);
        assert!(rules.contains(&"invalid-parallelism".to_string()));
        assert!(rules.contains(&"invalid-timeout".to_string()));
    }

    #[test]
    fn validate_joins_messages() {
        let mut config = PipelineConfig::default();
        config.steps.insert("x".into(), StepConfig::default());
        config.steps.insert("y".into(), StepConfig::default());
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("'x'"));
        assert!(err.to_string().contains("'y'"));
    }
}
