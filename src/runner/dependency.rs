//! Dependency graph over the enabled steps of a run.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{PipewaveError, Result};
use crate::steps::StepDefinition;

/// Validated, acyclic dependency relationships between steps.
///
/// Edges point from a dependency to its dependents. Every id is kept in
/// sorted collections so traversals and error reports are deterministic.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Map of step id to its direct dependencies.
    dependencies: BTreeMap<String, BTreeSet<String>>,
    /// Map of step id to steps that depend on it.
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Create a new dependency graph builder.
    pub fn builder() -> DependencyGraphBuilder {
        DependencyGraphBuilder::new()
    }

    /// Build and validate a graph from step definitions.
    ///
    /// Fails with `MissingDependency` if a definition references a step that
    /// is not among `definitions`, then with `CyclicDependency` carrying the
    /// full cycle path.
    pub fn build(definitions: &[StepDefinition]) -> Result<Self> {
        definitions
            .iter()
            .fold(Self::builder(), |builder, def| {
                builder.add_step(def.id.clone(), def.depends_on.iter().cloned())
            })
            .build()
    }

    /// Get the direct dependencies of a step.
    pub fn dependencies_of(&self, step: &str) -> Option<&BTreeSet<String>> {
        self.dependencies.get(step)
    }

    /// Get steps that depend on the given step.
    pub fn dependents_of(&self, step: &str) -> Option<&BTreeSet<String>> {
        self.dependents.get(step)
    }

    /// Check if a step exists in the graph.
    pub fn contains(&self, step: &str) -> bool {
        self.dependencies.contains_key(step)
    }

    /// All step ids in sorted order.
    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.dependencies.keys().map(String::as_str)
    }

    /// Get the number of steps in the graph.
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Find a cycle, returning its path with the first id repeated at the end.
    ///
    /// The path follows dependency edges: `[a, b, a]` means `a` depends on
    /// `b` and `b` depends on `a`.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        fn dfs<'a>(
            node: &'a str,
            graph: &'a DependencyGraph,
            state: &mut BTreeMap<&'a str, State>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            state.insert(node, State::Visiting);
            path.push(node);

            for dep in graph.dependencies.get(node).into_iter().flatten() {
                match state.get(dep.as_str()).copied() {
                    Some(State::Visiting) => {
                        let start = path.iter().position(|s| *s == dep.as_str()).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|s| s.to_string()).collect();
                        cycle.push(dep.clone());
                        return Some(cycle);
                    }
                    Some(State::Unvisited) | None => {
                        if let Some(cycle) = dfs(dep, graph, state, path) {
                            return Some(cycle);
                        }
                    }
                    Some(State::Visited) => {}
                }
            }

            path.pop();
            state.insert(node, State::Visited);
            None
        }

        let mut state: BTreeMap<&str, State> =
            self.steps().map(|s| (s, State::Unvisited)).collect();
        let mut path = Vec::new();

        for step in self.steps() {
            if state.get(step) == Some(&State::Unvisited) {
                if let Some(cycle) = dfs(step, self, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }
}

/// Builder for constructing a DependencyGraph.
#[derive(Debug, Default)]
pub struct DependencyGraphBuilder {
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraphBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step with its dependencies.
    pub fn add_step<I, S>(mut self, id: impl Into<String>, depends_on: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .entry(id.into())
            .or_default()
            .extend(depends_on.into_iter().map(Into::into));
        self
    }

    /// Build the dependency graph.
    ///
    /// Returns an error if any dependency references a step that was not
    /// added, or if the dependencies form a cycle.
    pub fn build(self) -> Result<DependencyGraph> {
        for (step, deps) in &self.dependencies {
            if let Some(missing) = deps.iter().find(|d| !self.dependencies.contains_key(*d)) {
                return Err(PipewaveError::MissingDependency {
                    step: step.clone(),
                    dependency: missing.clone(),
                });
            }
        }

        let mut dependents: BTreeMap<String, BTreeSet<String>> = self
            .dependencies
            .keys()
            .map(|s| (s.clone(), BTreeSet::new()))
            .collect();

        for (step, deps) in &self.dependencies {
            for dep in deps {
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .insert(step.clone());
            }
        }

        let graph = DependencyGraph {
            dependencies: self.dependencies,
            dependents,
        };

        if let Some(cycle) = graph.find_cycle() {
            return Err(PipewaveError::CyclicDependency { cycle });
        }

        Ok(graph)
    }
}
