// ABOUTME: Definition-level validation beyond structural parsing
// ABOUTME: Produces a report of errors and advisory warnings for a graph

use std::collections::HashSet;

use super::error::DefinitionError;
use super::node::NodeKind;
use super::workflow::WorkflowDefinition;
use crate::engine::navigator::GraphNavigator;

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<DefinitionError>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct DefinitionValidator;

impl DefinitionValidator {
    /// Full advisory validation: structural errors, startability, and
    /// warnings a workflow author should see before wiring the graph to
    /// live tasks.
    pub fn validate(definition: &WorkflowDefinition) -> ValidationReport {
        let mut report = ValidationReport::default();

        if let Err(err) = definition.validate_structure() {
            report.errors.push(err);
        }

        if GraphNavigator::start_node(definition).is_none() {
            report.errors.push(DefinitionError::NoStartNode);
        }

        for node in &definition.nodes {
            if let NodeKind::Condition { .. } = node.kind {
                let outgoing: Vec<_> = definition.edges_from(&node.id).collect();
                if outgoing.is_empty() {
                    report.warnings.push(format!(
                        "condition node '{}' has no outgoing edges; evaluation ends the workflow",
                        node.id
                    ));
                } else if !outgoing.iter().any(|e| e.label.is_some()) {
                    report.warnings.push(format!(
                        "condition node '{}' has no labeled branches; the first edge always wins",
                        node.id
                    ));
                }
            }
        }

        if let Some(start) = GraphNavigator::start_node(definition) {
            let reachable = reachable_from(definition, &start.id);
            for node in &definition.nodes {
                if !reachable.contains(node.id.as_str()) {
                    report.warnings.push(format!(
                        "node '{}' is unreachable from the start node '{}'",
                        node.id, start.id
                    ));
                }
            }
        }

        report
    }
}

fn reachable_from<'a>(definition: &'a WorkflowDefinition, start_id: &'a str) -> HashSet<&'a str> {
    let mut reachable = HashSet::new();
    let mut frontier = vec![start_id];

    while let Some(node_id) = frontier.pop() {
        if !reachable.insert(node_id) {
            continue;
        }
        for edge in definition.edges_from(node_id) {
            frontier.push(edge.target.as_str());
        }
        if let Some(node) = definition.node(node_id) {
            if let Some(target) = &node.on_error_next_node {
                frontier.push(target.as_str());
            }
        }
    }

    reachable
}
