//! Core abstractions for the node graph engine
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: dynamic values, the node contract, the workflow
//! graph model, the error taxonomy and execution events.

mod error;
pub mod events;
mod node;
mod value;
mod workflow;

pub use error::{DanglingReason, FlowError, NodeError, ValidationError, WorkflowError};
pub use events::{EventBus, EventEmitter, ExecutionEvent, ExecutionId, NodeEvent};
pub use node::{
    CategorizedParameters, Node, NodeContext, NodeDescriptor, NodeOutput, ParameterSpec, PortSpec,
};
pub use value::{Value, ValueKind};
pub use workflow::{Edge, NodeInstance, WorkflowGraph};
