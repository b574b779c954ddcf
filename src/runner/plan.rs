//! Execution waves.
//!
//! A wave is a set of mutually independent steps whose dependencies all live
//! in earlier waves. Waves run strictly one after another; members of a wave
//! run concurrently.

use std::collections::BTreeMap;

use serde::Serialize;

use super::dependency::DependencyGraph;

/// One group of steps eligible to run concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wave {
    /// Zero-based position in the plan.
    pub index: usize,
    /// Step ids, sorted.
    pub steps: Vec<String>,
}

/// Ordered waves covering every step of a graph exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecutionPlan {
    waves: Vec<Wave>,
}

impl ExecutionPlan {
    /// The waves in execution order.
    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Iterate over waves in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, Wave> {
        self.waves.iter()
    }

    /// Number of waves.
    pub fn len(&self) -> usize {
        self.waves.len()
    }

    /// Whether the plan has no waves.
    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    /// Total number of steps across all waves.
    pub fn step_count(&self) -> usize {
        self.waves.iter().map(|w| w.steps.len()).sum()
    }

    /// Index of the wave containing `step`.
    pub fn wave_of(&self, step: &str) -> Option<usize> {
        self.waves
            .iter()
            .find(|w| w.steps.iter().any(|s| s == step))
            .map(|w| w.index)
    }

    /// Step ids grouped by wave.
    pub fn to_groups(&self) -> Vec<Vec<String>> {
        self.waves.iter().map(|w| w.steps.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a ExecutionPlan {
    type Item = &'a Wave;
    type IntoIter = std::slice::Iter<'a, Wave>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl DependencyGraph {
    /// Partition the graph into waves.
    ///
    /// Wave 0 holds every step without dependencies; a step joins the wave
    /// after the one in which its last dependency was placed. Ties are broken
    /// by id.
    ///
    /// # Panics
    ///
    /// Panics if a step cannot be placed. Building a graph rejects cycles, so
    /// this only happens if that validation was bypassed.
    pub fn topological_waves(&self) -> ExecutionPlan {
        let mut in_degree: BTreeMap<&str, usize> = self
            .steps()
            .map(|s| (s, self.dependencies_of(s).map_or(0, |d| d.len())))
            .collect();

        let mut current: Vec<String> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(step, _)| step.to_string())
            .collect();

        let mut waves = Vec::new();
        let mut placed = 0;

        while !current.is_empty() {
            let mut next = Vec::new();
            for step in &current {
                for dependent in self.dependents_of(step).into_iter().flatten() {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(dependent.clone());
                        }
                    }
                }
            }
            next.sort();

            placed += current.len();
            waves.push(Wave {
                index: waves.len(),
                steps: current,
            });
            current = next;
        }

        assert_eq!(
            placed,
            self.len(),
            "dependency graph contains a cycle that escaped validation"
        );

        ExecutionPlan { waves }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::StepDefinition;
    use std::collections::HashSet;

    fn pipeline() -> DependencyGraph {
        DependencyGraph::build(&[
            StepDefinition::new("applications"),
            StepDefinition::new("marketing"),
            StepDefinition::new("popularity"),
            StepDefinition::new("sdc").depends_on(["applications", "marketing"]),
            StepDefinition::new("reports").depends_on(["applications", "marketing"]),
        ])
        .unwrap()
    }

    #[test]
    fn empty_graph_has_no_waves() {
        let plan = DependencyGraph::default().topological_waves();
        assert!(plan.is_empty());
        assert_eq!(plan.step_count(), 0);
    }

    #[test]
    fn pipeline_splits_into_two_waves() {
        let plan = pipeline().topological_waves();
        assert_eq!(
            plan.to_groups(),
            vec![
                vec!["applications", "marketing", "popularity"],
                vec!["reports", "sdc"],
            ]
        );
        assert_eq!(plan.wave_of("sdc"), Some(1));
        assert_eq!(plan.wave_of("ghost"), None);
    }

    #[test]
    fn chain_produces_one_step_per_wave() {
        let graph = DependencyGraph::build(&[
            StepDefinition::new("c").depends_on(["b"]),
            StepDefinition::new("b").depends_on(["a"]),
            StepDefinition::new("a"),
        ])
        .unwrap();
        let plan = graph.topological_waves();
        assert_eq!(plan.to_groups(), vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn step_waits_for_its_deepest_dependency() {
        let graph = DependencyGraph::build(&[
            StepDefinition::new("a"),
            StepDefinition::new("b").depends_on(["a"]),
            StepDefinition::new("d").depends_on(["a", "b"]),
        ])
        .unwrap();
        let plan = graph.topological_waves();
        assert_eq!(plan.wave_of("d"), Some(2));
    }

    #[test]
    fn waves_cover_every_step_once_after_dependencies() {
        let graph = DependencyGraph::build(&[
            StepDefinition::new("a"),
            StepDefinition::new("b").depends_on(["a"]),
            StepDefinition::new("c").depends_on(["a"]),
            StepDefinition::new("d").depends_on(["b", "c"]),
            StepDefinition::new("e"),
            StepDefinition::new("f").depends_on(["e", "d"]),
        ])
        .unwrap();
        let plan = graph.topological_waves();

        let mut seen = HashSet::new();
        for wave in &plan {
            for step in &wave.steps {
                assert!(seen.insert(step.clone()), "{step} placed twice");
                for dep in graph.dependencies_of(step).unwrap() {
                    assert!(plan.wave_of(dep).unwrap() < wave.index);
                }
            }
        }
        assert_eq!(seen.len(), graph.len());
    }

    #[test]
    fn plan_serializes_as_wave_list() {
        let json = serde_json::to_value(pipeline().topological_waves()).unwrap();
        assert_eq!(json[1]["index"], 1);
        assert_eq!(json[1]["steps"][0], "reports");
    }
}
