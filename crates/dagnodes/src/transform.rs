use async_trait::async_trait;
use dagcore::{
    Node, NodeContext, NodeDescriptor, NodeError, NodeOutput, ParameterSpec, Value, ValueKind,
};

/// Parse JSON string to Value
pub struct JsonParseNode {
    descriptor: NodeDescriptor,
}

impl JsonParseNode {
    pub fn new() -> Self {
        Self {
            descriptor: NodeDescriptor::new("transform.json_parse")
                .with_name("Parse JSON")
                .with_description("Parse JSON string")
                .with_category("transform")
                .with_tag("json")
                .with_parameter(ParameterSpec::required("json", ValueKind::String))
                .with_output("parsed", ValueKind::Any),
        }
    }
}

impl Default for JsonParseNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for JsonParseNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let input = ctx.require_str("json")?;

        let parsed: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| NodeError::ExecutionFailed(format!("JSON parse error: {}", e)))?;

        Ok(NodeOutput::new().with_output("parsed", Value::from(parsed)))
    }
}

/// Stringify Value to JSON
pub struct JsonStringifyNode {
    descriptor: NodeDescriptor,
}

impl JsonStringifyNode {
    pub fn new() -> Self {
        Self {
            descriptor: NodeDescriptor::new("transform.json_stringify")
                .with_name("Stringify JSON")
                .with_description("Convert value to JSON string")
                .with_category("transform")
                .with_tag("json")
                .with_parameter(ParameterSpec::required("value", ValueKind::Any))
                .with_parameter(
                    ParameterSpec::optional("pretty", ValueKind::Bool)
                        .with_default(false)
                        .with_description("Indent the output"),
                )
                .with_output("json", ValueKind::String),
        }
    }
}

impl Default for JsonStringifyNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for JsonStringifyNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let value = ctx.require_input("value")?.to_json();
        let pretty = ctx
            .get_input_or("pretty", Value::Bool(false))
            .as_bool()
            .unwrap_or(false);

        let json_str = if pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
        .map_err(|e| NodeError::ExecutionFailed(format!("JSON stringify error: {}", e)))?;

        Ok(NodeOutput::new().with_output("json", json_str))
    }
}
