//! Standard node library
//!
//! Collection of built-in nodes for common operations

mod debug;
mod http;
mod math;
mod text;
mod time;
mod transform;

pub use debug::DebugNode;
pub use http::HttpRequestNode;
pub use math::ArithmeticNode;
pub use text::ConcatNode;
pub use time::DelayNode;
pub use transform::{JsonParseNode, JsonStringifyNode};

use dagruntime::NodeRegistry;
use std::sync::Arc;

/// Register all standard nodes with a registry
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(ArithmeticNode::add()));
    registry.register(Arc::new(ArithmeticNode::subtract()));
    registry.register(Arc::new(ArithmeticNode::multiply()));
    registry.register(Arc::new(ArithmeticNode::divide()));
    registry.register(Arc::new(ConcatNode::new()));
    registry.register(Arc::new(DebugNode::new()));
    registry.register(Arc::new(DelayNode::new()));
    registry.register(Arc::new(HttpRequestNode::new()));
    registry.register(Arc::new(JsonParseNode::new()));
    registry.register(Arc::new(JsonStringifyNode::new()));
}

/// A registry holding every standard node
pub fn standard_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry);
    registry
}
