use async_trait::async_trait;
use dagcore::{
    Node, NodeContext, NodeDescriptor, NodeError, NodeOutput, ParameterSpec, Value, ValueKind,
};
use tokio::time::{sleep, Duration};

/// Delay execution for a specified duration
pub struct DelayNode {
    descriptor: NodeDescriptor,
}

impl DelayNode {
    pub fn new() -> Self {
        Self {
            descriptor: NodeDescriptor::new("time.delay")
                .with_name("Delay")
                .with_description("Delay execution for specified milliseconds")
                .with_category("time")
                .with_tag("time")
                .with_parameter(
                    ParameterSpec::optional("delay_ms", ValueKind::Number).with_default(1000.0),
                )
                .with_parameter(
                    ParameterSpec::optional("value", ValueKind::Any)
                        .with_default(Value::Null)
                        .with_description("Passed through after the delay"),
                )
                .with_output("value", ValueKind::Any),
        }
    }
}

impl Default for DelayNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for DelayNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let delay_ms = ctx.require_f64("delay_ms")?;
        if delay_ms < 0.0 {
            return Err(NodeError::Configuration(format!(
                "delay_ms must be non-negative, got {}",
                delay_ms
            )));
        }

        ctx.events.info(format!("Delaying for {}ms", delay_ms));

        tokio::select! {
            _ = sleep(Duration::from_millis(delay_ms as u64)) => {}
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        }

        Ok(NodeOutput::new().with_output("value", ctx.get_input_or("value", Value::Null)))
    }
}
