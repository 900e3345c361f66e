use crate::graph::DependencyGraph;
use crate::registry::NodeResolver;
use crate::scheduler::Schedule;
use chrono::Utc;
use dagcore::{
    EventBus, ExecutionEvent, ExecutionId, FlowError, Node, NodeContext, NodeDescriptor,
    NodeError, NodeInstance, NodeOutput, Value, WorkflowGraph,
};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Runs a validated workflow batch by batch.
///
/// Each instance is invoked at most once per run. A failed instance gets a
/// `Failed` result and everything downstream of it is `Skipped`; unrelated
/// branches keep running.
pub struct WorkflowExecutor {
    max_parallel: usize,
    node_timeout: Option<Duration>,
}

impl WorkflowExecutor {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
            node_timeout: None,
        }
    }

    /// Fail any single node invocation that runs longer than `timeout`
    pub fn with_node_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.node_timeout = timeout;
        self
    }

    /// Execute `workflow` in `schedule` order.
    ///
    /// Returns `Err` only for cancellation or a broken engine invariant;
    /// node failures are reported inside the [`ExecutionReport`].
    pub async fn run(
        &self,
        workflow: &WorkflowGraph,
        schedule: &Schedule,
        resolver: &dyn NodeResolver,
        event_bus: &EventBus,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport, FlowError> {
        let execution_id = ExecutionId::new_v4();
        let start_time = Instant::now();
        let deps = DependencyGraph::build(workflow)?;

        event_bus.emit(ExecutionEvent::WorkflowStarted {
            execution_id,
            node_count: workflow.nodes.len(),
            batch_count: schedule.len(),
            timestamp: Utc::now(),
        });

        tracing::info!(
            "Starting execution {}: {} nodes in {} batches",
            execution_id,
            workflow.nodes.len(),
            schedule.len()
        );

        let mut run = RunState::new(execution_id, event_bus, &deps);
        let outcome = self
            .run_batches(workflow, schedule, resolver, cancel, &mut run)
            .await;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let failed_nodes = run.failed_count();

        event_bus.emit(ExecutionEvent::WorkflowCompleted {
            execution_id,
            success: outcome.is_ok() && failed_nodes == 0,
            failed_nodes,
            duration_ms,
            timestamp: Utc::now(),
        });

        outcome?;

        tracing::info!(
            "Execution {} finished in {}ms ({} failed, {} skipped)",
            execution_id,
            duration_ms,
            failed_nodes,
            run.skipped.len()
        );

        Ok(ExecutionReport {
            execution_id,
            schedule: schedule.clone(),
            results: run.results,
            duration_ms,
        })
    }

    async fn run_batches(
        &self,
        workflow: &WorkflowGraph,
        schedule: &Schedule,
        resolver: &dyn NodeResolver,
        cancel: &CancellationToken,
        run: &mut RunState<'_>,
    ) -> Result<(), FlowError> {
        for (index, batch) in schedule.batches().iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!("Execution {} cancelled before batch {}", run.execution_id, index);
                return Err(FlowError::Cancelled);
            }

            run.event_bus.emit(ExecutionEvent::BatchStarted {
                execution_id: run.execution_id,
                index,
                instance_ids: batch.clone(),
                timestamp: Utc::now(),
            });
            tracing::debug!("Batch {}: {:?}", index, batch);

            let mut ready = Vec::new();
            for instance_id in batch {
                if let Some(cause) = run.skipped.get(instance_id).cloned() {
                    run.record_skipped(instance_id, cause);
                    continue;
                }

                let instance = workflow.find_node(instance_id).ok_or_else(|| {
                    FlowError::Internal(format!(
                        "scheduled instance {} is not in the workflow",
                        instance_id
                    ))
                })?;
                let node = resolver.resolve(&instance.type_id).ok_or_else(|| {
                    FlowError::Internal(format!(
                        "node type {} vanished from the registry",
                        instance.type_id
                    ))
                })?;

                match resolve_inputs(workflow, instance, node.descriptor(), &run.results)? {
                    Ok(inputs) => ready.push(ReadyNode {
                        instance_id: instance_id.clone(),
                        type_id: instance.type_id.clone(),
                        node,
                        inputs,
                    }),
                    Err(error) => {
                        run.announce_failure(instance_id, &error);
                        run.record_failure(instance_id, error, 0);
                    }
                }
            }

            let outcomes = self.run_batch(ready, run, cancel).await?;
            for outcome in outcomes {
                match outcome.result {
                    Ok(outputs) => {
                        run.record_success(&outcome.instance_id, outputs, outcome.duration_ms)
                    }
                    Err(error) => {
                        run.record_failure(&outcome.instance_id, error, outcome.duration_ms)
                    }
                }
            }
        }

        Ok(())
    }

    /// Run one batch on parallel tasks, bounded by `max_parallel`.
    ///
    /// Completions are announced as they arrive; outcomes come back in batch
    /// order. Dropping the returned future aborts every node still running.
    async fn run_batch(
        &self,
        ready: Vec<ReadyNode>,
        run: &RunState<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<NodeOutcome>, FlowError> {
        let mut queue = ready.into_iter().enumerate();
        let mut tasks: JoinSet<NodeOutcome> = JoinSet::new();
        let mut outcomes = Vec::new();

        loop {
            while tasks.len() < self.max_parallel {
                let Some((position, ready)) = queue.next() else {
                    break;
                };

                run.event_bus.emit(ExecutionEvent::NodeStarted {
                    execution_id: run.execution_id,
                    instance_id: ready.instance_id.clone(),
                    type_id: ready.type_id.clone(),
                    timestamp: Utc::now(),
                });
                tracing::debug!("Starting {} ({})", ready.instance_id, ready.type_id);

                let ctx = NodeContext {
                    instance_id: ready.instance_id.clone(),
                    inputs: ready.inputs,
                    events: run
                        .event_bus
                        .create_emitter(run.execution_id, ready.instance_id.clone()),
                    cancellation: cancel.child_token(),
                };
                let invocation = invoke(ready.node, ctx, self.node_timeout);
                let instance_id = ready.instance_id;

                tasks.spawn(async move {
                    let start = Instant::now();
                    let result = match AssertUnwindSafe(invocation).catch_unwind().await {
                        Ok(result) => result.map(|output| output.outputs),
                        Err(payload) => Err(NodeError::Panicked(panic_message(payload))),
                    };
                    NodeOutcome {
                        position,
                        instance_id,
                        result,
                        duration_ms: start.elapsed().as_millis() as u64,
                    }
                });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let outcome = joined
                .map_err(|e| FlowError::Internal(format!("node task join error: {}", e)))?;

            match &outcome.result {
                Ok(outputs) => {
                    run.announce_success(&outcome.instance_id, outputs, outcome.duration_ms)
                }
                Err(error) => run.announce_failure(&outcome.instance_id, error),
            }
            outcomes.push(outcome);
        }

        outcomes.sort_by_key(|o| o.position);
        Ok(outcomes)
    }
}

async fn invoke(
    node: Arc<dyn Node>,
    ctx: NodeContext,
    timeout: Option<Duration>,
) -> Result<NodeOutput, NodeError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, node.execute(ctx))
            .await
            .unwrap_or_else(|_| {
                Err(NodeError::Timeout {
                    millis: limit.as_millis() as u64,
                })
            }),
        None => node.execute(ctx).await,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "node task panicked".to_string())
}

/// Resolve each declared parameter from its literal, its inbound edge, or
/// its default. The outer `Err` is an engine fault; the inner one fails
/// only this node.
fn resolve_inputs(
    workflow: &WorkflowGraph,
    instance: &NodeInstance,
    descriptor: &NodeDescriptor,
    results: &HashMap<String, ExecutionResult>,
) -> Result<Result<HashMap<String, Value>, NodeError>, FlowError> {
    let mut inputs = HashMap::new();

    for param in &descriptor.parameters {
        let value = if let Some(literal) = instance.parameters.get(&param.name) {
            literal.clone()
        } else if let Some(edge) = workflow
            .incoming(&instance.id)
            .find(|edge| edge.target_port == param.name)
        {
            let upstream = results.get(&edge.source).ok_or_else(|| {
                FlowError::Internal(format!(
                    "{} reads {} before it has run",
                    instance.id, edge.source
                ))
            })?;
            if !upstream.is_success() {
                return Err(FlowError::Internal(format!(
                    "{} was scheduled although upstream {} did not succeed",
                    instance.id, edge.source
                )));
            }
            match upstream.outputs.get(&edge.source_port) {
                Some(value) => value.clone(),
                None => {
                    return Ok(Err(NodeError::MissingUpstreamOutput {
                        source_id: edge.source.clone(),
                        port: edge.source_port.clone(),
                    }))
                }
            }
        } else if let Some(default) = &param.default {
            default.clone()
        } else {
            continue;
        };

        if !param.kind.accepts(&value) {
            return Ok(Err(NodeError::InvalidInputType {
                field: param.name.clone(),
                expected: param.kind.to_string(),
                actual: value.kind().to_string(),
            }));
        }

        inputs.insert(param.name.clone(), value);
    }

    Ok(Ok(inputs))
}

struct ReadyNode {
    instance_id: String,
    type_id: String,
    node: Arc<dyn Node>,
    inputs: HashMap<String, Value>,
}

struct NodeOutcome {
    position: usize,
    instance_id: String,
    result: Result<HashMap<String, Value>, NodeError>,
    duration_ms: u64,
}

/// Mutable bookkeeping for one run; nothing outlives the run
struct RunState<'a> {
    execution_id: ExecutionId,
    event_bus: &'a EventBus,
    deps: &'a DependencyGraph<'a>,
    results: HashMap<String, ExecutionResult>,
    /// Instances that must not run, mapped to the failed ancestor
    skipped: HashMap<String, String>,
}

impl<'a> RunState<'a> {
    fn new(
        execution_id: ExecutionId,
        event_bus: &'a EventBus,
        deps: &'a DependencyGraph<'a>,
    ) -> Self {
        Self {
            execution_id,
            event_bus,
            deps,
            results: HashMap::new(),
            skipped: HashMap::new(),
        }
    }

    fn failed_count(&self) -> usize {
        self.results
            .values()
            .filter(|r| matches!(r.status, NodeStatus::Failed(_)))
            .count()
    }

    fn announce_success(
        &self,
        instance_id: &str,
        outputs: &HashMap<String, Value>,
        duration_ms: u64,
    ) {
        tracing::info!("Node {} completed in {}ms", instance_id, duration_ms);

        self.event_bus.emit(ExecutionEvent::NodeCompleted {
            execution_id: self.execution_id,
            instance_id: instance_id.to_string(),
            outputs: outputs.clone(),
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    fn announce_failure(&self, instance_id: &str, error: &NodeError) {
        tracing::error!("Node {} failed: {}", instance_id, error);

        self.event_bus.emit(ExecutionEvent::NodeFailed {
            execution_id: self.execution_id,
            instance_id: instance_id.to_string(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn record_success(
        &mut self,
        instance_id: &str,
        outputs: HashMap<String, Value>,
        duration_ms: u64,
    ) {
        self.results.insert(
            instance_id.to_string(),
            ExecutionResult {
                status: NodeStatus::Success,
                outputs,
                duration_ms,
            },
        );
    }

    /// Store the failure and mark every descendant as skipped
    fn record_failure(&mut self, instance_id: &str, error: NodeError, duration_ms: u64) {
        for dependent in self.deps.descendants(instance_id) {
            self.skipped
                .entry(dependent.to_string())
                .or_insert_with(|| instance_id.to_string());
        }

        self.results.insert(
            instance_id.to_string(),
            ExecutionResult {
                status: NodeStatus::Failed(error),
                outputs: HashMap::new(),
                duration_ms,
            },
        );
    }

    fn record_skipped(&mut self, instance_id: &str, caused_by: String) {
        tracing::warn!("Skipping {}: upstream {} failed", instance_id, caused_by);

        self.event_bus.emit(ExecutionEvent::NodeSkipped {
            execution_id: self.execution_id,
            instance_id: instance_id.to_string(),
            caused_by: caused_by.clone(),
            timestamp: Utc::now(),
        });

        self.results.insert(
            instance_id.to_string(),
            ExecutionResult {
                status: NodeStatus::Skipped { caused_by },
                outputs: HashMap::new(),
                duration_ms: 0,
            },
        );
    }
}

/// Outcome of one instance within a run. Written once, never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub status: NodeStatus,
    pub outputs: HashMap<String, Value>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == NodeStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeStatus {
    Success,
    Failed(NodeError),
    /// Never invoked because `caused_by` (an ancestor) failed
    Skipped { caused_by: String },
}

/// Result of workflow execution
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub execution_id: ExecutionId,
    pub schedule: Schedule,
    pub results: HashMap<String, ExecutionResult>,
    pub duration_ms: u64,
}

impl ExecutionReport {
    pub fn result(&self, instance_id: &str) -> Option<&ExecutionResult> {
        self.results.get(instance_id)
    }

    /// Output value of one port, if the instance succeeded and produced it
    pub fn output(&self, instance_id: &str, port: &str) -> Option<&Value> {
        self.result(instance_id)
            .filter(|r| r.is_success())
            .and_then(|r| r.outputs.get(port))
    }

    pub fn failed(&self) -> Vec<&str> {
        self.with_status(|s| matches!(s, NodeStatus::Failed(_)))
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.with_status(|s| matches!(s, NodeStatus::Skipped { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.results.values().all(ExecutionResult::is_success)
    }

    fn with_status(&self, predicate: impl Fn(&NodeStatus) -> bool) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .results
            .iter()
            .filter(|(_, r)| predicate(&r.status))
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort();
        ids
    }
}
