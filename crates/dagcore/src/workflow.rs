use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Node graph submitted for one execution.
///
/// Deserializes from the request shape
/// `{ nodes: [{id, type, parameters}], edges: [{source, sourcePort, target, targetPort}] }`;
/// unrecognised fields such as an editor `view` are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkflowGraph {
    #[serde(default)]
    pub nodes: Vec<NodeInstance>,

    #[serde(default)]
    pub edges: Vec<Edge>,

    /// Instances whose outputs are reported even if they feed other nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeInstance) -> String {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    pub fn connect(
        &mut self,
        source: impl Into<String>,
        source_port: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
    ) {
        self.edges.push(Edge {
            source: source.into(),
            source_port: source_port.into(),
            target: target.into(),
            target_port: target_port.into(),
        });
    }

    pub fn designate_output(&mut self, instance_id: impl Into<String>) {
        self.outputs.push(instance_id.into());
    }

    pub fn find_node(&self, id: &str) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges feeding inputs of `id`
    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    /// Edges reading outputs of `id`
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// No outgoing edges, or explicitly designated as an output
    pub fn is_terminal(&self, id: &str) -> bool {
        self.outputs.iter().any(|o| o == id) || self.outgoing(id).next().is_none()
    }
}

/// A parameterized occurrence of a node type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeInstance {
    pub id: String,

    #[serde(rename = "type")]
    pub type_id: String,

    /// Literal parameter values
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
}

impl NodeInstance {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// `target.target_port` is supplied by `source.source_port`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    pub source_port: String,
    pub target: String,
    pub target_port: String,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source, self.source_port, self.target, self.target_port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let json = r#"{
            "nodes": [
                {"id": "A", "type": "math.add", "parameters": {"x": 2, "y": 3}},
                {"id": "B", "type": "math.multiply", "parameters": {"y": 4}}
            ],
            "edges": [{"source": "A", "sourcePort": "out", "target": "B", "targetPort": "x"}],
            "view": {"zoom": 1.0}
        }"#;

        let graph: WorkflowGraph = serde_json::from_str(json).unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].parameters["x"], Value::Number(2.0));
        assert_eq!(graph.edges[0].to_string(), "A.out -> B.x");
        assert!(graph.is_terminal("B"));
        assert!(!graph.is_terminal("A"));
    }

    #[test]
    fn test_designated_output_is_terminal() {
        let mut graph = WorkflowGraph::new();
        graph.add_node(NodeInstance::new("A", "math.add"));
        graph.add_node(NodeInstance::new("B", "math.add"));
        graph.connect("A", "out", "B", "x");
        graph.designate_output("A");

        assert!(graph.is_terminal("A"));
    }
}
