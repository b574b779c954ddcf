//! Configuration schema definitions for Pipewave.
//!
//! These structs map to the YAML format of `.pipewave/config.yml` and convert
//! into the engine's [`RunConfig`] and [`StepRegistry`].

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipewaveError, Result};
use crate::registry::StepRegistry;
use crate::runner::{DependencyFailurePolicy, RunConfig};
use crate::steps::{CommandStep, StepDefinition};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pipeline name (for display purposes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Run policy
    pub workflow: WorkflowSettings,

    /// Failure budgets
    pub error_handling: ErrorHandlingSettings,

    /// Step definitions, keyed by id
    pub steps: BTreeMap<String, StepConfig>,
}

/// Workflow-level execution policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Steps to run, in order. Omitted means every configured step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_steps: Option<Vec<String>>,

    /// Dependency overrides, replacing a step's `depends_on`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub step_dependencies: BTreeMap<String, Vec<String>>,

    /// Maximum concurrently running steps
    pub max_parallel_steps: usize,

    /// Timeout for steps without their own, in seconds
    pub default_timeout_secs: u64,

    /// Keep running independent steps after a failure
    pub continue_on_error: bool,

    /// Allow retryable steps to be retried
    pub retry_failed_steps: bool,

    /// Default retry ceiling for retryable steps
    pub max_retries: u32,

    /// What to do with steps downstream of a failure
    pub on_dependency_failure: DependencyFailurePolicy,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            enabled_steps: None,
            step_dependencies: BTreeMap::new(),
            max_parallel_steps: default_max_parallel_steps(),
            default_timeout_secs: default_timeout_secs(),
            continue_on_error: true,
            retry_failed_steps: true,
            max_retries: default_max_retries(),
            on_dependency_failure: DependencyFailurePolicy::Skip,
        }
    }
}

fn default_max_parallel_steps() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    30 * 60
}

fn default_max_retries() -> u32 {
    2
}

/// Error budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandlingSettings {
    /// Whether a step should skip bad items instead of failing outright
    pub continue_on_error: bool,

    /// Abort the run once more steps than this have failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_failed_steps: Option<usize>,
}

impl Default for ErrorHandlingSettings {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            max_failed_steps: None,
        }
    }
}

/// A single step definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Shell command to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Steps that must succeed first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Per-attempt timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Whether failed attempts may be retried
    #[serde(skip_serializing_if = "is_false")]
    pub retryable: bool,

    /// Retry ceiling; falls back to `workflow.max_retries`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Working directory, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

fn is_false(v: &bool) -> bool {
    !v
}

impl StepConfig {
    /// Engine-side definition of this step.
    pub fn to_definition(&self, id: &str) -> StepDefinition {
        let mut def = StepDefinition::new(id).depends_on(self.depends_on.iter().cloned());
        def.description = self.description.clone();
        def.timeout = self.timeout_secs.map(Duration::from_secs);
        def.retryable = self.retryable;
        def.max_retries = self.max_retries;
        def
    }
}

impl PipelineConfig {
    /// Ids of the steps to run, in order.
    pub fn enabled_steps(&self) -> Vec<String> {
        match &self.workflow.enabled_steps {
            Some(enabled) => enabled.clone(),
            None => self.steps.keys().cloned().collect(),
        }
    }

    /// Run policy for the engine.
    pub fn run_config(&self) -> RunConfig {
        let workflow = &self.workflow;
        RunConfig {
            enabled_steps: self.enabled_steps(),
            step_dependencies: workflow
                .step_dependencies
                .iter()
                .map(|(id, deps)| (id.clone(), deps.iter().cloned().collect()))
                .collect(),
            max_parallel_steps: workflow.max_parallel_steps,
            default_timeout: Duration::from_secs(workflow.default_timeout_secs),
            continue_on_error: workflow.continue_on_error,
            retry_failed_steps: workflow.retry_failed_steps,
            max_retries: workflow.max_retries,
            on_dependency_failure: workflow.on_dependency_failure,
            max_failed_steps: self.error_handling.max_failed_steps,
            continue_on_item_error: self.error_handling.continue_on_error,
        }
    }

    /// Register every configured step as a shell command.
    ///
    /// Commands run from `project_root`, or from the step's `working_dir`
    /// resolved against it.
    pub fn registry(&self, project_root: &Path) -> Result<StepRegistry> {
        let mut registry = StepRegistry::new();

        for (id, step) in &self.steps {
            let command = step
                .command
                .as_deref()
                .ok_or_else(|| PipewaveError::ConfigValidationError {
                    message: format!("Step '{}' has no command", id),
                })?;

            let cwd = match &step.working_dir {
                Some(dir) => project_root.join(dir),
                None => project_root.to_path_buf(),
            };

            let unit = CommandStep::new(command)
                .current_dir(cwd)
                .envs(step.env.clone());
            registry.register(step.to_definition(id), unit)?;
        }

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPELINE: &str = r#"
name: catalog
workflow:
  enabled_steps: [applications, marketing_descriptions, popularity_codes, sdc_template]
  step_dependencies:
    sdc_template: [marketing_descriptions, popularity_codes]
  max_parallel_steps: 2
  default_timeout_secs: 60
  continue_on_error: false
  on_dependency_failure: run_anyway
error_handling:
  continue_on_error: false
  max_failed_steps: 1
steps:
  applications:
    command: echo applications
    timeout_secs: 5
    retryable: true
  marketing_descriptions:
    command: echo marketing
  popularity_codes:
    command: echo popularity
    retryable: true
    max_retries: 4
  sdc_template:
    description: Populate the SDC template
    command: echo sdc
"#;

    #[test]
    fn defaults_match_pipeline_policy() {
        let config = PipelineConfig::default();
        assert_eq!(config.workflow.max_parallel_steps, 3);
        assert_eq!(config.workflow.default_timeout_secs, 1800);
        assert!(config.workflow.continue_on_error);
        assert!(config.error_handling.continue_on_error);
        assert!(config.error_handling.max_failed_steps.is_none());
    }

    #[test]
    fn parses_full_config() {
        let config: PipelineConfig = serde_yaml::from_str(PIPELINE).unwrap();
        assert_eq!(config.name.as_deref(), Some("catalog"));
        assert_eq!(config.steps.len(), 4);
        assert_eq!(
            config.workflow.on_dependency_failure,
            DependencyFailurePolicy::RunAnyway
        );
        assert_eq!(config.steps["popularity_codes"].max_retries, Some(4));
    }

    #[test]
    fn run_config_carries_both_error_flags() {
        let config: PipelineConfig = serde_yaml::from_str(PIPELINE).unwrap();
        let run = config.run_config();
        assert_eq!(run.max_parallel_steps, 2);
        assert_eq!(run.default_timeout, Duration::from_secs(60));
        assert!(!run.continue_on_error);
        assert!(!run.continue_on_item_error);
        assert_eq!(run.max_failed_steps, Some(1));
        assert_eq!(run.step_dependencies["sdc_template"].len(), 2);
        assert_eq!(run.enabled_steps[0], "applications");
    }

    #[test]
    fn omitted_enabled_steps_means_all_steps() {
        let config: PipelineConfig = serde_yaml::from_str(
            r#"
steps:
  b: { command: "true" }
  a: { command: "true" }
"#,
        )
        .unwrap();
        assert_eq!(config.enabled_steps(), vec!["a", "b"]);
    }

    #[test]
    fn step_config_converts_to_definition() {
        let config: PipelineConfig = serde_yaml::from_str(PIPELINE).unwrap();
        let def = config.steps["applications"].to_definition("applications");
        assert_eq!(def.timeout, Some(Duration::from_secs(5)));
        assert!(def.retryable);
        assert_eq!(def.max_retries, None);
        assert_eq!(def.effective_retries(true, 2), 2);
    }

    #[test]
    fn registry_registers_every_step() {
        let config: PipelineConfig = serde_yaml::from_str(PIPELINE).unwrap();
        let registry = config.registry(Path::new(".")).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(
            registry
                .get("sdc_template")
                .unwrap()
                .definition()
                .description
                .as_deref(),
            Some("Populate the SDC template")
        );
    }

    #[test]
    fn registry_rejects_step_without_command() {
        let mut config = PipelineConfig::default();
        config.steps.insert("empty".into(), StepConfig::default());
        let err = config.registry(Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("no command"));
    }

    #[test]
    fn serializes_without_defaults_noise() {
        let step = StepConfig {
            command: Some("echo hi".into()),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&step).unwrap();
        assert_eq!(yaml.trim(), "command: echo hi");
    }
}
