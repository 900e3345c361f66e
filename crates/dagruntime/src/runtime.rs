use crate::aggregator::{self, WorkflowOutputs, WorkflowResponse};
use crate::config::RuntimeConfig;
use crate::executor::{ExecutionReport, WorkflowExecutor};
use crate::registry::NodeRegistry;
use crate::scheduler::{self, Schedule};
use crate::validator::GraphValidator;
use dagcore::{EventBus, ExecutionEvent, FlowError, WorkflowGraph};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Main entry point: validate, schedule, execute, aggregate
pub struct WorkflowRuntime {
    registry: Arc<NodeRegistry>,
    executor: WorkflowExecutor,
    event_bus: Arc<EventBus>,
}

/// Everything one successful run produced
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub report: ExecutionReport,
    pub outputs: WorkflowOutputs,
}

impl WorkflowRuntime {
    /// Create a runtime with an empty registry and default settings
    pub fn new() -> Self {
        Self::with_registry(Arc::new(NodeRegistry::new()), RuntimeConfig::default())
    }

    /// Create a runtime with a pre-populated registry
    pub fn with_registry(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        let executor = WorkflowExecutor::new(config.max_parallel_nodes)
            .with_node_timeout(config.node_timeout());
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size.max(1)));

        Self {
            registry,
            executor,
            event_bus,
        }
    }

    /// Check a workflow without running it
    pub fn validate(&self, workflow: &WorkflowGraph) -> Result<(), FlowError> {
        GraphValidator::new(self.registry.as_ref()).validate(workflow)?;
        Ok(())
    }

    /// Validate and compute the batch order
    pub fn plan(&self, workflow: &WorkflowGraph) -> Result<Schedule, FlowError> {
        self.validate(workflow)?;
        Ok(scheduler::order(workflow)?)
    }

    /// Execute a workflow to completion
    pub async fn execute(&self, workflow: &WorkflowGraph) -> Result<WorkflowRun, FlowError> {
        self.execute_with_cancel(workflow, CancellationToken::new()).await
    }

    /// Execute a workflow; cancelling `cancel` stops the run before the next batch
    pub async fn execute_with_cancel(
        &self,
        workflow: &WorkflowGraph,
        cancel: CancellationToken,
    ) -> Result<WorkflowRun, FlowError> {
        let schedule = self.plan(workflow)?;

        let report = self
            .executor
            .run(
                workflow,
                &schedule,
                self.registry.as_ref(),
                &self.event_bus,
                &cancel,
            )
            .await?;

        let outputs = aggregator::collect(workflow, &report.results)?;
        Ok(WorkflowRun { report, outputs })
    }

    /// Execute and fold the outcome into the response envelope
    pub async fn handle(&self, workflow: &WorkflowGraph) -> WorkflowResponse {
        match self.execute(workflow).await {
            Ok(run) => WorkflowResponse::from_outputs(run.outputs),
            Err(e) => {
                if e.is_client_error() {
                    tracing::warn!("Rejected workflow: {}", e);
                } else {
                    tracing::error!("Workflow execution failed: {}", e);
                }
                WorkflowResponse::from_error(&e)
            }
        }
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }
}

impl Default for WorkflowRuntime {
    fn default() -> Self {
        Self::new()
    }
}
