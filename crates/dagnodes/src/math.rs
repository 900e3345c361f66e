use async_trait::async_trait;
use dagcore::{Node, NodeContext, NodeDescriptor, NodeError, NodeOutput, ParameterSpec, ValueKind};

type Operation = fn(f64, f64) -> Result<f64, NodeError>;

/// Binary arithmetic on parameters `x` and `y`, result on port `out`
pub struct ArithmeticNode {
    descriptor: NodeDescriptor,
    operation: Operation,
}

impl ArithmeticNode {
    fn build(type_id: &str, name: &str, description: &str, operation: Operation) -> Self {
        let descriptor = NodeDescriptor::new(type_id)
            .with_name(name)
            .with_description(description)
            .with_category("math")
            .with_tag("math")
            .with_tag("arithmetic")
            .with_parameter(
                ParameterSpec::required("x", ValueKind::Number).with_description("Left operand"),
            )
            .with_parameter(
                ParameterSpec::required("y", ValueKind::Number).with_description("Right operand"),
            )
            .with_output("out", ValueKind::Number);

        Self {
            descriptor,
            operation,
        }
    }

    pub fn add() -> Self {
        Self::build("math.add", "Add", "Sum of x and y", |x, y| Ok(x + y))
    }

    pub fn subtract() -> Self {
        Self::build("math.subtract", "Subtract", "Difference x - y", |x, y| Ok(x - y))
    }

    pub fn multiply() -> Self {
        Self::build("math.multiply", "Multiply", "Product of x and y", |x, y| Ok(x * y))
    }

    pub fn divide() -> Self {
        Self::build("math.divide", "Divide", "Quotient x / y", |x, y| {
            if y == 0.0 {
                Err(NodeError::ExecutionFailed("division by zero".to_string()))
            } else {
                Ok(x / y)
            }
        })
    }
}

#[async_trait]
impl Node for ArithmeticNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let x = ctx.require_f64("x")?;
        let y = ctx.require_f64("y")?;
        let result = (self.operation)(x, y)?;

        Ok(NodeOutput::new().with_output("out", result))
    }
}
