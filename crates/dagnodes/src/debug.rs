use async_trait::async_trait;
use dagcore::{
    Node, NodeContext, NodeDescriptor, NodeError, NodeOutput, ParameterSpec, Value, ValueKind,
};

/// Logs its input and passes it through unchanged
pub struct DebugNode {
    descriptor: NodeDescriptor,
}

impl DebugNode {
    pub fn new() -> Self {
        Self {
            descriptor: NodeDescriptor::new("debug.log")
                .with_name("Debug Log")
                .with_description("Logs input values for debugging")
                .with_category("debug")
                .with_tag("debug")
                .with_parameter(ParameterSpec::required("message", ValueKind::Any))
                .with_parameter(
                    ParameterSpec::optional("label", ValueKind::String).with_default("DEBUG"),
                )
                .with_output("message", ValueKind::Any),
        }
    }
}

impl Default for DebugNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for DebugNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let message = ctx.require_input("message")?.clone();
        let label = ctx.get_input_or("label", Value::from("DEBUG"));

        tracing::info!("[{}] {}: {}", ctx.instance_id, label, message);
        ctx.events.info(format!("{}: {}", label, message));

        Ok(NodeOutput::new().with_output("message", message))
    }
}
