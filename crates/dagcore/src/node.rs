use crate::{events::EventEmitter, NodeError, Value, ValueKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Core trait that all executable node types implement.
///
/// One implementation serves every instance of its type; instance-specific
/// data arrives through the [`NodeContext`].
#[async_trait]
pub trait Node: Send + Sync {
    /// Static metadata: type id, parameters, output ports
    fn descriptor(&self) -> &NodeDescriptor;

    /// Execute one instance with its resolved inputs
    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError>;

    /// Unique type identifier (e.g., "math.add", "transform.json_parse")
    fn node_type(&self) -> &str {
        &self.descriptor().type_id
    }
}

/// Static description of a node type, as surfaced to the engine and catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDescriptor {
    #[serde(rename = "id")]
    pub type_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub outputs: Vec<PortSpec>,
}

impl NodeDescriptor {
    pub fn new(type_id: impl Into<String>) -> Self {
        let type_id = type_id.into();
        Self {
            name: type_id.clone(),
            type_id,
            description: String::new(),
            category: "general".to_string(),
            tags: Vec::new(),
            parameters: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.outputs.push(PortSpec {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn has_output(&self, port: &str) -> bool {
        self.outputs.iter().any(|o| o.name == port)
    }

    /// Split parameters into required ("basic") and optional ("advanced")
    pub fn categorized_parameters(&self) -> CategorizedParameters<'_> {
        let (basic, advanced): (Vec<_>, Vec<_>) =
            self.parameters.iter().partition(|p| p.required);
        CategorizedParameters { basic, advanced }
    }
}

/// Parameters of one node type grouped for display
#[derive(Debug, Serialize)]
pub struct CategorizedParameters<'a> {
    pub basic: Vec<&'a ParameterSpec>,
    pub advanced: Vec<&'a ParameterSpec>,
}

impl CategorizedParameters<'_> {
    pub fn has_advanced(&self) -> bool {
        !self.advanced.is_empty()
    }
}

/// A declared input parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "type", default)]
    pub kind: ValueKind,
    #[serde(default)]
    pub description: String,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            required: true,
            default: None,
            kind,
            description: String::new(),
        }
    }

    pub fn optional(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A declared output port
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ValueKind,
}

/// Execution context passed to each node
#[derive(Clone)]
pub struct NodeContext {
    /// Instance id within the running workflow
    pub instance_id: String,

    /// Resolved parameter values (literals, upstream outputs, defaults)
    pub inputs: HashMap<String, Value>,

    /// Event emitter for real-time updates
    pub events: EventEmitter,

    /// Cancelled when the caller aborts the run
    pub cancellation: CancellationToken,
}

impl NodeContext {
    pub fn new(instance_id: impl Into<String>, events: EventEmitter) -> Self {
        Self {
            instance_id: instance_id.into(),
            inputs: HashMap::new(),
            events,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, NodeError> {
        self.inputs
            .get(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }

    pub fn require_f64(&self, name: &str) -> Result<f64, NodeError> {
        let value = self.require_input(name)?;
        value
            .as_f64()
            .ok_or_else(|| invalid_type(name, ValueKind::Number, value))
    }

    pub fn require_str(&self, name: &str) -> Result<&str, NodeError> {
        let value = self.require_input(name)?;
        value
            .as_str()
            .ok_or_else(|| invalid_type(name, ValueKind::String, value))
    }

    /// Get input with default
    pub fn get_input_or(&self, name: &str, default: Value) -> Value {
        self.inputs.get(name).cloned().unwrap_or(default)
    }
}

fn invalid_type(field: &str, expected: ValueKind, actual: &Value) -> NodeError {
    NodeError::InvalidInputType {
        field: field.to_string(),
        expected: expected.to_string(),
        actual: actual.kind().to_string(),
    }
}

/// Output from node execution
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeOutput {
    /// Output port values
    pub outputs: HashMap<String, Value>,
}

impl NodeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(port.into(), value.into());
        self
    }
}
