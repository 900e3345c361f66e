use crate::registry::NodeRegistry;
use async_trait::async_trait;
use dagcore::{
    Node, NodeContext, NodeDescriptor, NodeError, NodeOutput, ParameterSpec, Value, ValueKind,
};
use std::sync::Arc;

/// Descriptor-only node; emits `null` on every declared output
pub(crate) struct StubNode {
    descriptor: NodeDescriptor,
}

impl StubNode {
    pub(crate) fn arc(descriptor: NodeDescriptor) -> Arc<dyn Node> {
        Arc::new(Self { descriptor })
    }
}

#[async_trait]
impl Node for StubNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn execute(&self, _ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        Ok(self
            .descriptor
            .outputs
            .iter()
            .fold(NodeOutput::new(), |out, port| out.with_output(port.name.clone(), Value::Null)))
    }
}

pub(crate) fn stub_registry() -> NodeRegistry {
    let binary = |type_id: &str| {
        NodeDescriptor::new(type_id)
            .with_parameter(ParameterSpec::required("x", ValueKind::Number))
            .with_parameter(ParameterSpec::required("y", ValueKind::Number))
            .with_output("out", ValueKind::Number)
    };

    let mut registry = NodeRegistry::new();
    registry.register(StubNode::arc(binary("add")));
    registry.register(StubNode::arc(binary("multiply")));
    registry.register(StubNode::arc(
        NodeDescriptor::new("needs_k")
            .with_parameter(ParameterSpec::required("k", ValueKind::Any))
            .with_parameter(ParameterSpec::optional("scale", ValueKind::Number).with_default(1.0)),
    ));
    registry.register(StubNode::arc(
        NodeDescriptor::new("optional_no_default")
            .with_parameter(ParameterSpec::optional("hint", ValueKind::String)),
    ));
    registry
}
