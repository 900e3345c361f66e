use crate::registry::NodeResolver;
use dagcore::{DanglingReason, Node, ValidationError, WorkflowError, WorkflowGraph};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Structural and parameter checks run before any node executes.
///
/// Checks run by category; the first category with violations stops
/// validation, and every violation in that category is reported.
pub struct GraphValidator<'r> {
    resolver: &'r dyn NodeResolver,
}

impl<'r> GraphValidator<'r> {
    pub fn new(resolver: &'r dyn NodeResolver) -> Self {
        Self { resolver }
    }

    pub fn validate(&self, workflow: &WorkflowGraph) -> Result<(), WorkflowError> {
        reject(check_unique_ids(workflow))?;

        let (nodes, unknown) = self.resolve_types(workflow);
        reject(unknown)?;

        reject(check_edges(workflow, &nodes))?;
        reject(check_parameter_sources(workflow, &nodes))?;
        reject(check_single_writer(workflow))?;

        warn_unused_literals(workflow, &nodes);
        Ok(())
    }

    fn resolve_types<'w>(
        &self,
        workflow: &'w WorkflowGraph,
    ) -> (HashMap<&'w str, Arc<dyn Node>>, Vec<ValidationError>) {
        let mut nodes = HashMap::new();
        let mut errors = Vec::new();

        for instance in &workflow.nodes {
            match self.resolver.resolve(&instance.type_id) {
                Some(node) => {
                    nodes.insert(instance.id.as_str(), node);
                }
                None => errors.push(ValidationError::UnknownNodeType {
                    instance_id: instance.id.clone(),
                    type_id: instance.type_id.clone(),
                }),
            }
        }

        (nodes, errors)
    }
}

fn reject(errors: Vec<ValidationError>) -> Result<(), WorkflowError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::Validation(errors))
    }
}

fn check_unique_ids(workflow: &WorkflowGraph) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut errors = Vec::new();

    for instance in &workflow.nodes {
        let id = instance.id.as_str();
        if !seen.insert(id) && reported.insert(id) {
            errors.push(ValidationError::DuplicateInstance {
                instance_id: id.to_string(),
            });
        }
    }

    errors
}

fn check_edges(
    workflow: &WorkflowGraph,
    nodes: &HashMap<&str, Arc<dyn Node>>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut dangling = |edge: &dagcore::Edge, reason| {
        errors.push(ValidationError::DanglingEdge {
            edge: edge.clone(),
            reason,
        })
    };

    for edge in &workflow.edges {
        match nodes.get(edge.source.as_str()) {
            None => dangling(edge, DanglingReason::UnknownSource),
            Some(node) if !node.descriptor().has_output(&edge.source_port) => {
                dangling(edge, DanglingReason::UnknownSourcePort)
            }
            Some(_) => {}
        }

        match nodes.get(edge.target.as_str()) {
            None => dangling(edge, DanglingReason::UnknownTarget),
            Some(node) if node.descriptor().parameter(&edge.target_port).is_none() => {
                dangling(edge, DanglingReason::UnknownTargetPort)
            }
            Some(_) => {}
        }
    }

    for output in &workflow.outputs {
        if !nodes.contains_key(output.as_str()) {
            errors.push(ValidationError::UnknownOutput {
                instance_id: output.clone(),
            });
        }
    }

    errors
}

fn check_parameter_sources(
    workflow: &WorkflowGraph,
    nodes: &HashMap<&str, Arc<dyn Node>>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for instance in &workflow.nodes {
        let Some(node) = nodes.get(instance.id.as_str()) else {
            continue;
        };

        for param in &node.descriptor().parameters {
            let literal = instance.parameters.contains_key(&param.name);
            let wired = workflow
                .incoming(&instance.id)
                .any(|edge| edge.target_port == param.name);

            if literal && wired {
                errors.push(ValidationError::ConflictingParameter {
                    instance_id: instance.id.clone(),
                    parameter: param.name.clone(),
                });
            } else if !literal && !wired && (param.required || param.default.is_none()) {
                errors.push(ValidationError::MissingParameter {
                    instance_id: instance.id.clone(),
                    parameter: param.name.clone(),
                });
            }
        }
    }

    errors
}

fn check_single_writer(workflow: &WorkflowGraph) -> Vec<ValidationError> {
    let mut writers: Vec<((&str, &str), usize)> = Vec::new();

    for edge in &workflow.edges {
        let key = (edge.target.as_str(), edge.target_port.as_str());
        match writers.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => writers.push((key, 1)),
        }
    }

    writers
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((instance_id, port), edges)| ValidationError::DuplicateInput {
            instance_id: instance_id.to_string(),
            port: port.to_string(),
            edges,
        })
        .collect()
}

fn warn_unused_literals(workflow: &WorkflowGraph, nodes: &HashMap<&str, Arc<dyn Node>>) {
    for instance in &workflow.nodes {
        let Some(node) = nodes.get(instance.id.as_str()) else {
            continue;
        };
        for name in instance.parameters.keys() {
            if node.descriptor().parameter(name).is_none() {
                tracing::warn!(
                    "Ignoring literal '{}' on {}: not a parameter of {}",
                    name,
                    instance.id,
                    instance.type_id
                );
            }
        }
    }
}
