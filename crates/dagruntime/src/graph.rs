use dagcore::{DanglingReason, ValidationError, WorkflowError, WorkflowGraph};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::HashMap;

/// Instance-level dependency graph: an edge `a -> b` means b depends on a.
///
/// Node indices follow declaration order in the workflow, and parallel
/// edges between the same pair of instances collapse into one dependency.
pub struct DependencyGraph<'a> {
    graph: DiGraph<&'a str, ()>,
    index: HashMap<&'a str, NodeIndex>,
}

impl<'a> DependencyGraph<'a> {
    /// Build a dependency graph from the workflow's edges
    pub fn build(workflow: &'a WorkflowGraph) -> Result<Self, WorkflowError> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for node in &workflow.nodes {
            index
                .entry(node.id.as_str())
                .or_insert_with(|| graph.add_node(node.id.as_str()));
        }

        let mut dangling = Vec::new();
        for edge in &workflow.edges {
            match (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
                (Some(from), Some(to)) => {
                    graph.update_edge(*from, *to, ());
                }
                (None, _) => dangling.push(ValidationError::DanglingEdge {
                    edge: edge.clone(),
                    reason: DanglingReason::UnknownSource,
                }),
                (_, None) => dangling.push(ValidationError::DanglingEdge {
                    edge: edge.clone(),
                    reason: DanglingReason::UnknownTarget,
                }),
            }
        }

        if !dangling.is_empty() {
            return Err(WorkflowError::Validation(dangling));
        }

        Ok(Self { graph, index })
    }

    pub fn graph(&self) -> &DiGraph<&'a str, ()> {
        &self.graph
    }

    /// Every instance reachable from `id` over directed edges, excluding `id`
    pub fn descendants(&self, id: &str) -> Vec<&'a str> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };

        let mut reached = Vec::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                reached.push(self.graph[idx]);
            }
        }
        reached
    }

    /// Instances lying on at least one cycle, in declaration order
    pub fn cycle_members(&self) -> Vec<String> {
        let mut members: Vec<NodeIndex> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .flatten()
            .collect();
        members.sort();
        members.into_iter().map(|idx| self.graph[idx].to_string()).collect()
    }
}
