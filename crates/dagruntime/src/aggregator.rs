use crate::executor::{ExecutionResult, NodeStatus};
use dagcore::{FlowError, Value, WorkflowGraph};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// What a terminal instance contributes to the response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TerminalOutput {
    Success { outputs: BTreeMap<String, Value> },
    Failed { error: String },
    Skipped { caused_by: String },
}

impl TerminalOutput {
    pub fn outputs(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            TerminalOutput::Success { outputs } => Some(outputs),
            _ => None,
        }
    }
}

impl From<&ExecutionResult> for TerminalOutput {
    fn from(result: &ExecutionResult) -> Self {
        match &result.status {
            NodeStatus::Success => TerminalOutput::Success {
                outputs: result
                    .outputs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            },
            NodeStatus::Failed(error) => TerminalOutput::Failed {
                error: error.to_string(),
            },
            NodeStatus::Skipped { caused_by } => TerminalOutput::Skipped {
                caused_by: caused_by.clone(),
            },
        }
    }
}

/// Terminal instance id -> its outputs or status
pub type WorkflowOutputs = BTreeMap<String, TerminalOutput>;

/// Collect the outputs of terminal instances: those without outgoing edges
/// plus any the request designated as outputs.
pub fn collect(
    workflow: &WorkflowGraph,
    results: &HashMap<String, ExecutionResult>,
) -> Result<WorkflowOutputs, FlowError> {
    workflow
        .nodes
        .iter()
        .filter(|instance| workflow.is_terminal(&instance.id))
        .map(|instance| -> Result<(String, TerminalOutput), FlowError> {
            let result = results.get(&instance.id).ok_or_else(|| {
                FlowError::Internal(format!("no execution result for {}", instance.id))
            })?;
            Ok((instance.id.clone(), TerminalOutput::from(result)))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Envelope returned to the HTTP layer
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResponse {
    pub status: ResponseStatus,
    pub outputs: WorkflowOutputs,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl WorkflowResponse {
    /// The workflow ran; individual terminals may still be failed or skipped
    pub fn from_outputs(outputs: WorkflowOutputs) -> Self {
        let failed = outputs
            .values()
            .filter(|o| matches!(o, TerminalOutput::Failed { .. }))
            .count();
        let skipped = outputs
            .values()
            .filter(|o| matches!(o, TerminalOutput::Skipped { .. }))
            .count();

        let message = if failed + skipped == 0 {
            "Workflow executed successfully".to_string()
        } else {
            format!(
                "Workflow executed with {} failed and {} skipped terminal nodes",
                failed, skipped
            )
        };

        Self {
            status: ResponseStatus::Success,
            outputs,
            message,
            errors: Vec::new(),
        }
    }

    /// The workflow was rejected or aborted; no outputs are trusted
    pub fn from_error(error: &FlowError) -> Self {
        let errors = match error {
            FlowError::Workflow(workflow_error) => workflow_error.violations(),
            _ => Vec::new(),
        };

        Self {
            status: ResponseStatus::Error,
            outputs: WorkflowOutputs::new(),
            message: error.to_string(),
            errors,
        }
    }
}
