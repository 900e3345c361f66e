//! Workflow execution runtime
//!
//! This crate provides the engine that runs node graphs: the node registry,
//! graph validation, batch scheduling, parallel execution with failure
//! isolation, and aggregation of terminal outputs.

mod aggregator;
mod config;
mod executor;
mod graph;
mod registry;
mod runtime;
pub mod scheduler;
#[cfg(test)]
mod testing;
mod validator;

pub use aggregator::{collect, ResponseStatus, TerminalOutput, WorkflowOutputs, WorkflowResponse};
pub use config::RuntimeConfig;
pub use executor::{ExecutionReport, ExecutionResult, NodeStatus, WorkflowExecutor};
pub use graph::DependencyGraph;
pub use registry::{DescriptorIssue, NodeRegistry, NodeResolver};
pub use runtime::{WorkflowRun, WorkflowRuntime};
pub use scheduler::Schedule;
pub use validator::GraphValidator;
