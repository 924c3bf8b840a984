// ABOUTME: Graph navigation: next-node resolution and start-node selection
// ABOUTME: Handles the single condition hop with labeled-branch routing

use std::collections::HashSet;

use crate::definition::{
    ConditionConfig, NodeKind, Variables, WorkflowDefinition, WorkflowNode,
};

pub struct GraphNavigator;

impl GraphNavigator {
    /// The node a freshly started workflow begins on: the first node in
    /// definition order with no incoming edge, or of kind `task`.
    pub fn start_node(definition: &WorkflowDefinition) -> Option<&WorkflowNode> {
        let incoming: HashSet<&str> = definition
            .edges
            .iter()
            .map(|e| e.target.as_str())
            .collect();

        definition
            .nodes
            .iter()
            .find(|node| !incoming.contains(node.id.as_str()) || matches!(node.kind, NodeKind::Task))
    }

    /// Resolve the node after `current_node_id`, or `None` at the end of
    /// the graph. At most one condition hop is dereferenced: a condition
    /// reached here routes by its labeled branches, but a condition behind
    /// a condition is not followed further.
    pub fn next<'a>(
        definition: &'a WorkflowDefinition,
        current_node_id: &str,
        variables: &Variables,
    ) -> Option<&'a WorkflowNode> {
        // A workflow can sit on a condition node itself (after a rewind or
        // an error route); branching then happens from that node.
        if let Some(current) = definition.node(current_node_id) {
            if let NodeKind::Condition { data } = &current.kind {
                return Self::branch(definition, current, data, variables);
            }
        }

        let edge = definition.edges_from(current_node_id).next()?;
        let target = definition.node(&edge.target)?;

        match &target.kind {
            NodeKind::Condition { data } => Self::branch(definition, target, data, variables),
            _ => Some(target),
        }
    }

    /// Select among a condition node's outgoing edges: first the edge whose
    /// label matches the evaluated outcome, then the first edge as a
    /// fallback. No outgoing edge ends the workflow.
    fn branch<'a>(
        definition: &'a WorkflowDefinition,
        condition_node: &WorkflowNode,
        config: &ConditionConfig,
        variables: &Variables,
    ) -> Option<&'a WorkflowNode> {
        let satisfied = config.condition.evaluate(variables);
        let outgoing: Vec<_> = definition.edges_from(&condition_node.id).collect();

        let chosen = outgoing
            .iter()
            .find(|edge| edge.matches_branch(satisfied))
            .or_else(|| outgoing.first())?;

        definition.node(&chosen.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn branching_definition() -> WorkflowDefinition {
        WorkflowDefinition::from_json(json!({
            "id": "wf",
            "name": "Branching",
            "nodes": [
                {"id": "submit", "type": "task", "label": "Submit"},
                {"id": "gate", "type": "condition", "label": "Amount gate",
                 "data": {"condition": "amount > 5000"}},
                {"id": "escalate", "type": "task", "label": "Escalate"},
                {"id": "auto", "type": "task", "label": "Auto-approve"},
            ],
            "edges": [
                {"source": "submit", "target": "gate"},
                {"source": "gate", "target": "escalate", "label": "Yes"},
                {"source": "gate", "target": "auto", "label": "No"},
            ],
        }))
        .unwrap()
    }

    fn variables(amount: i64) -> Variables {
        let mut variables = Variables::new();
        variables.insert("amount".to_string(), json!(amount));
        variables
    }

    #[test]
    fn test_start_node_prefers_no_incoming_edge() {
        let definition = WorkflowDefinition::from_json(json!({
            "id": "wf",
            "name": "Start",
            "nodes": [
                {"id": "first", "type": "notification", "label": "First"},
                {"id": "second", "type": "task", "label": "Second"},
            ],
            "edges": [{"source": "first", "target": "second"}],
        }))
        .unwrap();

        let start = GraphNavigator::start_node(&definition).unwrap();
        assert_eq!(start.id, "first");
    }

    #[test]
    fn test_start_node_falls_back_to_task_kind() {
        let definition = WorkflowDefinition::from_json(json!({
            "id": "wf",
            "name": "Cycle",
            "nodes": [
                {"id": "a", "type": "approval", "label": "A"},
                {"id": "b", "type": "task", "label": "B"},
            ],
            "edges": [
                {"source": "a", "target": "b"},
                {"source": "b", "target": "a"},
            ],
        }))
        .unwrap();

        // Every node has an incoming edge; the first task-kind node wins.
        let start = GraphNavigator::start_node(&definition).unwrap();
        assert_eq!(start.id, "b");
    }

    #[test]
    fn test_no_start_node() {
        let definition = WorkflowDefinition::from_json(json!({
            "id": "wf",
            "name": "No start",
            "nodes": [
                {"id": "a", "type": "approval", "label": "A"},
                {"id": "b", "type": "approval", "label": "B"},
            ],
            "edges": [
                {"source": "a", "target": "b"},
                {"source": "b", "target": "a"},
            ],
        }))
        .unwrap();

        assert!(GraphNavigator::start_node(&definition).is_none());
    }

    #[test]
    fn test_next_returns_none_at_graph_end() {
        let definition = branching_definition();
        assert!(GraphNavigator::next(&definition, "escalate", &Variables::new()).is_none());
    }

    #[test]
    fn test_condition_routes_by_label() {
        let definition = branching_definition();

        let high = GraphNavigator::next(&definition, "submit", &variables(6000)).unwrap();
        assert_eq!(high.id, "escalate");

        let low = GraphNavigator::next(&definition, "submit", &variables(100)).unwrap();
        assert_eq!(low.id, "auto");
    }

    #[test]
    fn test_condition_missing_variable_takes_not_met_branch() {
        let definition = branching_definition();

        let next = GraphNavigator::next(&definition, "submit", &Variables::new()).unwrap();
        assert_eq!(next.id, "auto");
    }

    #[test]
    fn test_condition_without_matching_label_falls_back_to_first_edge() {
        let definition = WorkflowDefinition::from_json(json!({
            "id": "wf",
            "name": "Unlabeled",
            "nodes": [
                {"id": "submit", "type": "task", "label": "Submit"},
                {"id": "gate", "type": "condition", "label": "Gate",
                 "data": {"condition": "amount > 5000"}},
                {"id": "fallback", "type": "task", "label": "Fallback"},
            ],
            "edges": [
                {"source": "submit", "target": "gate"},
                {"source": "gate", "target": "fallback"},
            ],
        }))
        .unwrap();

        let next = GraphNavigator::next(&definition, "submit", &variables(9999)).unwrap();
        assert_eq!(next.id, "fallback");
    }

    #[test]
    fn test_branching_from_a_condition_current_step() {
        let definition = branching_definition();

        // e.g. after a rewind landed on the condition node itself.
        let next = GraphNavigator::next(&definition, "gate", &variables(6000)).unwrap();
        assert_eq!(next.id, "escalate");
    }
}
