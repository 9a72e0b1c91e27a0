use flowcore::StepNode;
use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use serde::Serialize;
use std::collections::HashSet;

/// Problem with the shape of a flow that makes some steps unreachable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum OrderingIssue {
    /// `dependency` was registered after `step`, so `step` never runs
    DependencyRegisteredLater { step: String, dependency: String },
    /// Steps that depend on each other, directly or transitively
    Cycle { steps: Vec<String> },
}

impl std::fmt::Display for OrderingIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderingIssue::DependencyRegisteredLater { step, dependency } => write!(
                f,
                "step '{}' depends on '{}', which is registered after it",
                step, dependency
            ),
            OrderingIssue::Cycle { steps } => {
                write!(f, "dependency cycle between: {}", steps.join(", "))
            }
        }
    }
}

/// Result of [`crate::Flow::analyze`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlowAnalysis {
    /// Steps that execute when every step succeeds, in execution order
    pub runnable: Vec<String>,
    /// Steps that never execute, whatever their actions return
    pub unreachable: Vec<String>,
    pub issues: Vec<OrderingIssue>,
}

impl FlowAnalysis {
    pub fn is_clean(&self) -> bool {
        self.unreachable.is_empty() && self.issues.is_empty()
    }
}

pub(crate) fn analyze(steps: &IndexMap<String, StepNode>) -> FlowAnalysis {
    let mut analysis = FlowAnalysis::default();

    // Replay the single pass assuming every action succeeds.
    let mut produced: HashSet<&str> = HashSet::new();
    for (name, node) in steps {
        if node.dependencies().iter().all(|dep| produced.contains(dep.as_str())) {
            produced.insert(name.as_str());
            analysis.runnable.push(name.clone());
        } else {
            analysis.unreachable.push(name.clone());
        }
    }

    for (index, (name, node)) in steps.iter().enumerate() {
        for dep in node.dependencies() {
            if steps.get_index_of(dep.as_str()).is_some_and(|dep_index| dep_index > index) {
                analysis.issues.push(OrderingIssue::DependencyRegisteredLater {
                    step: name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    let graph = build_graph(steps);
    for component in tarjan_scc(&graph) {
        let is_cycle = component.len() > 1
            || component
                .first()
                .is_some_and(|&idx| graph.contains_edge(idx, idx));
        if is_cycle {
            let mut members: Vec<usize> = component.iter().map(|idx| graph[*idx]).collect();
            members.sort_unstable();
            analysis.issues.push(OrderingIssue::Cycle {
                steps: members
                    .into_iter()
                    .filter_map(|i| steps.get_index(i).map(|(name, _)| name.clone()))
                    .collect(),
            });
        }
    }

    analysis
}

/// Dependency graph with edges pointing from dependency to dependent; node
/// weights are registration indices
fn build_graph(steps: &IndexMap<String, StepNode>) -> DiGraph<usize, ()> {
    let mut graph = DiGraph::new();
    let indices: Vec<_> = (0..steps.len()).map(|i| graph.add_node(i)).collect();

    for (index, node) in steps.values().enumerate() {
        for dep in node.dependencies() {
            if let Some(dep_index) = steps.get_index_of(dep.as_str()) {
                graph.add_edge(indices[dep_index], indices[index], ());
            }
        }
    }

    graph
}
