//! Step registry.
//!
//! Maps step ids to their definitions and units of work. The registry is
//! populated once before a run and only read afterwards; ids are resolved
//! eagerly so an unknown step is a configuration error, never a mid-run one.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{PipewaveError, Result};
use crate::steps::{StepDefinition, StepUnit};

/// A registered step: its metadata plus the unit that executes it.
#[derive(Clone)]
pub struct RegisteredStep {
    definition: StepDefinition,
    unit: Arc<dyn StepUnit>,
}

impl RegisteredStep {
    /// Declared metadata.
    pub fn definition(&self) -> &StepDefinition {
        &self.definition
    }

    /// Executable unit.
    pub fn unit(&self) -> Arc<dyn StepUnit> {
        Arc::clone(&self.unit)
    }
}

impl std::fmt::Debug for RegisteredStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredStep")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Registry of all known steps, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: BTreeMap<String, RegisteredStep>,
}

impl StepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step.
    ///
    /// Fails with `DuplicateStep` if the id is taken, and with
    /// `CyclicDependency` if the step depends on itself.
    pub fn register(&mut self, definition: StepDefinition, unit: impl StepUnit + 'static) -> Result<()> {
        self.register_arc(definition, Arc::new(unit))
    }

    /// Register a step whose unit is already shared.
    pub fn register_arc(&mut self, definition: StepDefinition, unit: Arc<dyn StepUnit>) -> Result<()> {
        if self.steps.contains_key(&definition.id) {
            return Err(PipewaveError::DuplicateStep { id: definition.id });
        }
        if definition.has_self_dependency() {
            return Err(PipewaveError::CyclicDependency {
                cycle: vec![definition.id.clone(), definition.id],
            });
        }

        tracing::debug!(step = %definition.id, "registered step");
        self.steps
            .insert(definition.id.clone(), RegisteredStep { definition, unit });
        Ok(())
    }

    /// Look up a step by id.
    pub fn get(&self, id: &str) -> Option<&RegisteredStep> {
        self.steps.get(id)
    }

    /// Check if a step is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.steps.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    /// Number of registered steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Registered steps whose ids are in `enabled`, in the caller's order.
    ///
    /// Fails with `UnknownStep` for the first enabled id that was never
    /// registered.
    pub fn get_enabled(&self, enabled: &[String]) -> Result<Vec<&RegisteredStep>> {
        enabled
            .iter()
            .map(|id| {
                self.steps
                    .get(id)
                    .ok_or_else(|| PipewaveError::UnknownStep { id: id.clone() })
            })
            .collect()
    }
}
