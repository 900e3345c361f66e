use crate::graph::DependencyGraph;
use dagcore::{WorkflowError, WorkflowGraph};
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashMap;

/// Execution order as a sequence of batches.
///
/// Instances inside one batch do not depend on each other and may run
/// concurrently; every edge points from an earlier batch to a later one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schedule {
    batches: Vec<Vec<String>>,
}

impl Schedule {
    pub fn batches(&self) -> &[Vec<String>] {
        &self.batches
    }

    pub fn into_batches(self) -> Vec<Vec<String>> {
        self.batches
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Index of the batch containing `instance_id`
    pub fn batch_of(&self, instance_id: &str) -> Option<usize> {
        self.batches
            .iter()
            .position(|batch| batch.iter().any(|id| id == instance_id))
    }
}

/// Compute the batch order for a workflow, or report the instances on a cycle
pub fn order(workflow: &WorkflowGraph) -> Result<Schedule, WorkflowError> {
    let deps = DependencyGraph::build(workflow)?;
    schedule(&deps)
}

/// Kahn-style reduction: each pass takes every instance whose dependencies
/// are all scheduled as the next batch.
pub fn schedule(deps: &DependencyGraph<'_>) -> Result<Schedule, WorkflowError> {
    let graph = deps.graph();
    let mut in_degree: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|idx| (idx, graph.neighbors_directed(idx, Direction::Incoming).count()))
        .collect();

    let mut remaining: Vec<NodeIndex> = graph.node_indices().collect();
    let mut batches = Vec::new();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<NodeIndex>, Vec<NodeIndex>) =
            remaining.into_iter().partition(|idx| in_degree[idx] == 0);

        if ready.is_empty() {
            let nodes = deps.cycle_members();
            tracing::debug!("Scheduling stalled with {} unresolved instances", blocked.len());
            return Err(WorkflowError::CyclicDependency { nodes });
        }

        for idx in &ready {
            for dependent in graph.neighbors_directed(*idx, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&dependent) {
                    *degree -= 1;
                }
            }
        }

        batches.push(ready.iter().map(|idx| graph[*idx].to_string()).collect());
        remaining = blocked;
    }

    Ok(Schedule { batches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagcore::NodeInstance;
    use std::collections::HashSet;

    fn workflow(ids: &[&str], edges: &[(&str, &str)]) -> WorkflowGraph {
        let mut workflow = WorkflowGraph::new();
        for id in ids {
            workflow.add_node(NodeInstance::new(*id, "stub"));
        }
        for (from, to) in edges {
            workflow.connect(*from, "out", *to, "in");
        }
        workflow
    }

    fn assert_valid_order(workflow: &WorkflowGraph, schedule: &Schedule) {
        let scheduled: Vec<&String> = schedule.batches().iter().flatten().collect();
        let unique: HashSet<&String> = scheduled.iter().copied().collect();
        assert_eq!(scheduled.len(), workflow.nodes.len());
        assert_eq!(unique.len(), workflow.nodes.len());

        for edge in &workflow.edges {
            let from = schedule.batch_of(&edge.source).unwrap();
            let to = schedule.batch_of(&edge.target).unwrap();
            assert!(from < to, "edge {} is not forward", edge);
        }
    }

    #[test]
    fn test_linear_chain() {
        let workflow = workflow(&["A", "B"], &[("A", "B")]);
        let schedule = order(&workflow).unwrap();

        assert_eq!(schedule.into_batches(), vec![vec!["A"], vec!["B"]]);
    }

    #[test]
    fn test_independent_nodes_single_batch() {
        let workflow = workflow(&["x", "y", "z"], &[]);
        let schedule = order(&workflow).unwrap();

        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.batches()[0], vec!["x", "y", "z"]);
    }

    #[test]
    fn test_diamond_with_tail() {
        let workflow = workflow(
            &["d", "b", "a", "c", "e", "solo"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "e")],
        );
        let schedule = order(&workflow).unwrap();

        assert_valid_order(&workflow, &schedule);
        assert_eq!(
            schedule.into_batches(),
            vec![vec!["a", "solo"], vec!["b", "c"], vec!["d"], vec!["e"]]
        );
    }

    #[test]
    fn test_parallel_edges_count_once() {
        let mut workflow = workflow(&["A", "B"], &[("A", "B")]);
        workflow.connect("A", "other", "B", "second");
        let schedule = order(&workflow).unwrap();

        assert_eq!(schedule.len(), 2);
    }

    #[test]
    fn test_two_node_cycle() {
        let workflow = workflow(&["A", "B"], &[("A", "B"), ("B", "A")]);

        match order(&workflow) {
            Err(WorkflowError::CyclicDependency { nodes }) => {
                assert_eq!(nodes, vec!["A", "B"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_loop() {
        let workflow = workflow(&["root", "loop"], &[("root", "loop"), ("loop", "loop")]);

        match order(&workflow) {
            Err(WorkflowError::CyclicDependency { nodes }) => assert_eq!(nodes, vec!["loop"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_permutation_invariance() {
        let edges = [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")];
        let forward = order(&workflow(&["a", "b", "c", "d"], &edges)).unwrap();
        let reversed = order(&workflow(&["d", "c", "b", "a"], &edges)).unwrap();

        let as_sets = |s: &Schedule| -> Vec<HashSet<String>> {
            s.batches().iter().map(|b| b.iter().cloned().collect()).collect()
        };
        assert_eq!(as_sets(&forward), as_sets(&reversed));
    }
}
