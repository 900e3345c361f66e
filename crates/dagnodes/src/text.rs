use async_trait::async_trait;
use dagcore::{
    Node, NodeContext, NodeDescriptor, NodeError, NodeOutput, ParameterSpec, Value, ValueKind,
};

/// Join two values as text
pub struct ConcatNode {
    descriptor: NodeDescriptor,
}

impl ConcatNode {
    pub fn new() -> Self {
        Self {
            descriptor: NodeDescriptor::new("text.concat")
                .with_name("Concatenate")
                .with_description("Join the text form of a and b")
                .with_category("text")
                .with_tag("text")
                .with_tag("string")
                .with_parameter(ParameterSpec::required("a", ValueKind::Any))
                .with_parameter(ParameterSpec::required("b", ValueKind::Any))
                .with_parameter(
                    ParameterSpec::optional("separator", ValueKind::String).with_default(""),
                )
                .with_output("text", ValueKind::String),
        }
    }
}

impl Default for ConcatNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ConcatNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let a = ctx.require_input("a")?;
        let b = ctx.require_input("b")?;
        let separator = ctx.get_input_or("separator", Value::from(""));

        Ok(NodeOutput::new().with_output("text", format!("{}{}{}", a, separator, b)))
    }
}
