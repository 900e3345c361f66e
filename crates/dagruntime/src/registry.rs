use dagcore::{Node, NodeDescriptor, ValueKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Lookup capability the validator and executor depend on.
///
/// Read-only during a run, so one resolver can serve concurrent executions.
pub trait NodeResolver: Send + Sync {
    /// Find the implementation for a node type
    fn resolve(&self, type_id: &str) -> Option<Arc<dyn Node>>;

    /// All known descriptors, sorted by type id
    fn list(&self) -> Vec<&NodeDescriptor>;
}

/// Registry of available node types
pub struct NodeRegistry {
    nodes: HashMap<String, Arc<dyn Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Register a node implementation under its descriptor's type id
    pub fn register(&mut self, node: Arc<dyn Node>) {
        let node_type = node.node_type().to_string();
        if self.nodes.insert(node_type.clone(), node).is_some() {
            tracing::warn!("Replaced existing node type: {}", node_type);
        } else {
            tracing::debug!("Registered node type: {}", node_type);
        }
    }

    /// Get all registered node types
    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.nodes.keys().cloned().collect();
        types.sort();
        types
    }

    /// Get the descriptor for a node type
    pub fn get_descriptor(&self, node_type: &str) -> Option<&NodeDescriptor> {
        self.nodes.get(node_type).map(|n| n.descriptor())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sanity-check every registered descriptor
    pub fn check_descriptors(&self) -> Vec<DescriptorIssue> {
        self.list().into_iter().flat_map(check_descriptor).collect()
    }
}

impl NodeResolver for NodeRegistry {
    fn resolve(&self, type_id: &str) -> Option<Arc<dyn Node>> {
        self.nodes.get(type_id).cloned()
    }

    fn list(&self) -> Vec<&NodeDescriptor> {
        let mut descriptors: Vec<&NodeDescriptor> =
            self.nodes.values().map(|n| n.descriptor()).collect();
        descriptors.sort_by(|a, b| a.type_id.cmp(&b.type_id));
        descriptors
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Problems in a descriptor that would confuse callers or the validator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorIssue {
    #[error("{type_id}: parameter '{name}' is declared more than once")]
    DuplicateParameter { type_id: String, name: String },

    #[error("{type_id}: output '{name}' is declared more than once")]
    DuplicateOutput { type_id: String, name: String },

    #[error("{type_id}: default for '{name}' is {actual}, declared as {expected}")]
    DefaultTypeMismatch {
        type_id: String,
        name: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("{type_id}: required parameter '{name}' has a default that is never applied")]
    UnusedDefault { type_id: String, name: String },
}

fn check_descriptor(descriptor: &NodeDescriptor) -> Vec<DescriptorIssue> {
    let type_id = &descriptor.type_id;
    let mut issues = Vec::new();

    let mut seen = HashSet::new();
    for param in &descriptor.parameters {
        if !seen.insert(param.name.as_str()) {
            issues.push(DescriptorIssue::DuplicateParameter {
                type_id: type_id.clone(),
                name: param.name.clone(),
            });
        }

        if let Some(default) = &param.default {
            if param.required {
                issues.push(DescriptorIssue::UnusedDefault {
                    type_id: type_id.clone(),
                    name: param.name.clone(),
                });
            }
            if !param.kind.accepts(default) {
                issues.push(DescriptorIssue::DefaultTypeMismatch {
                    type_id: type_id.clone(),
                    name: param.name.clone(),
                    expected: param.kind,
                    actual: default.kind(),
                });
            }
        }
    }

    let mut seen = HashSet::new();
    for output in &descriptor.outputs {
        if !seen.insert(output.name.as_str()) {
            issues.push(DescriptorIssue::DuplicateOutput {
                type_id: type_id.clone(),
                name: output.name.clone(),
            });
        }
    }

    issues
}
