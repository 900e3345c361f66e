use crate::workflow::Edge;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    /// True when the request itself was malformed (4xx-class), as opposed
    /// to a failure inside the engine or its environment (5xx-class).
    pub fn is_client_error(&self) -> bool {
        matches!(self, FlowError::Workflow(_) | FlowError::Serialization(_))
    }
}

/// Failure raised by a node implementation, or by the engine at the node
/// boundary. Never aborts the run; it becomes a `Failed` result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Upstream node '{source_id}' produced no output on port '{port}'")]
    MissingUpstreamOutput { source_id: String, port: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Node panicked: {0}")]
    Panicked(String),

    #[error("Timeout after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Cancelled")]
    Cancelled,
}

/// Pre-execution failures. Any of these rejects the whole run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Invalid workflow: {}", join_violations(.0))]
    Validation(Vec<ValidationError>),

    #[error("Cyclic dependency detected between: {}", .nodes.join(", "))]
    CyclicDependency { nodes: Vec<String> },
}

impl WorkflowError {
    /// Individual violations, one per line item
    pub fn violations(&self) -> Vec<String> {
        match self {
            WorkflowError::Validation(errors) => errors.iter().map(ToString::to_string).collect(),
            WorkflowError::CyclicDependency { .. } => vec![self.to_string()],
        }
    }
}

fn join_violations(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single structural or parameter violation found by the validator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate instance id: {instance_id}")]
    DuplicateInstance { instance_id: String },

    #[error("Unknown node type '{type_id}' for instance {instance_id}")]
    UnknownNodeType { instance_id: String, type_id: String },

    #[error("Dangling edge {edge}: {reason}")]
    DanglingEdge { edge: Edge, reason: DanglingReason },

    #[error("Designated output {instance_id} is not an instance of this workflow")]
    UnknownOutput { instance_id: String },

    #[error("Missing parameter '{parameter}' on {instance_id}")]
    MissingParameter { instance_id: String, parameter: String },

    #[error("Parameter '{parameter}' on {instance_id} has both a literal and an inbound edge")]
    ConflictingParameter { instance_id: String, parameter: String },

    #[error("Input '{port}' on {instance_id} is written by {edges} edges")]
    DuplicateInput {
        instance_id: String,
        port: String,
        edges: usize,
    },
}

/// Which end of an edge failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DanglingReason {
    UnknownSource,
    UnknownTarget,
    UnknownSourcePort,
    UnknownTargetPort,
}

impl fmt::Display for DanglingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DanglingReason::UnknownSource => "source instance does not exist",
            DanglingReason::UnknownTarget => "target instance does not exist",
            DanglingReason::UnknownSourcePort => "source node type declares no such output",
            DanglingReason::UnknownTargetPort => "target node type declares no such parameter",
        };
        f.write_str(reason)
    }
}
