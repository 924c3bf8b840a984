// ABOUTME: Core workflow definition data structures and parsing
// ABOUTME: Defines the graph of nodes and edges the engine walks

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::error::{DefinitionError, Result};
use super::node::WorkflowNode;

/// Workflow variables: name to JSON value, insertion-ordered so serialized
/// state stays stable.
pub type Variables = IndexMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl WorkflowDefinition {
    /// Parse a definition from its stored JSON document and reject
    /// structurally broken graphs up front.
    pub fn from_json(value: Value) -> Result<Self> {
        let definition: WorkflowDefinition = serde_json::from_value(value)?;
        definition.validate_structure()?;
        Ok(definition)
    }

    /// Structural checks: non-empty name, unique node ids, and every edge
    /// or error route pointing at a node that exists. Whether the graph can
    /// actually start is checked when a task starts (and reported by the
    /// validator), since stored definitions may be drafts.
    pub fn validate_structure(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::MissingField("name".to_string()));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(DefinitionError::DuplicateNode(node.id.clone()));
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(DefinitionError::UnknownEdgeNode {
                        edge_source: edge.source.clone(),
                        target: edge.target.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }

        for node in &self.nodes {
            if let Some(target) = &node.on_error_next_node {
                if !seen.contains(target.as_str()) {
                    return Err(DefinitionError::UnknownErrorRoute {
                        node: node.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn node(&self, node_id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn has_node(&self, node_id: &str) -> bool {
        self.node(node_id).is_some()
    }

    pub fn edges_from<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.source == node_id)
    }
}

impl Edge {
    /// Whether this edge's label selects the given condition outcome:
    /// "yes"/"true" for a satisfied condition, "no"/"false" otherwise,
    /// case-insensitively. Unlabeled edges never match a branch directly.
    pub fn matches_branch(&self, satisfied: bool) -> bool {
        let Some(label) = &self.label else {
            return false;
        };
        let label = label.trim().to_ascii_lowercase();
        if satisfied {
            matches!(label.as_str(), "yes" | "true")
        } else {
            matches!(label.as_str(), "no" | "false")
        }
    }
}

fn default_is_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_basic_definition() {
        let definition = WorkflowDefinition::from_json(json!({
            "id": "wf-1",
            "name": "Expense approval",
            "variables": {"region": "emea"},
            "nodes": [
                {"id": "submit", "type": "task", "label": "Submit expense"},
                {"id": "review", "type": "approval", "label": "Manager review"},
            ],
            "edges": [
                {"source": "submit", "target": "review"},
            ],
        }))
        .unwrap();

        assert_eq!(definition.name, "Expense approval");
        assert_eq!(definition.nodes.len(), 2);
        assert!(definition.is_active);
        assert_eq!(definition.variables.get("region"), Some(&json!("emea")));
        assert_eq!(definition.edges_from("submit").count(), 1);
    }

    #[test]
    fn test_duplicate_node_ids_rejected() {
        let result = WorkflowDefinition::from_json(json!({
            "id": "wf-1",
            "name": "Broken",
            "nodes": [
                {"id": "a", "type": "task", "label": "A"},
                {"id": "a", "type": "task", "label": "A again"},
            ],
        }));

        assert!(matches!(result, Err(DefinitionError::DuplicateNode(id)) if id == "a"));
    }

    #[test]
    fn test_edge_to_unknown_node_rejected() {
        let result = WorkflowDefinition::from_json(json!({
            "id": "wf-1",
            "name": "Broken",
            "nodes": [{"id": "a", "type": "task", "label": "A"}],
            "edges": [{"source": "a", "target": "ghost"}],
        }));

        assert!(matches!(
            result,
            Err(DefinitionError::UnknownEdgeNode { node, .. }) if node == "ghost"
        ));
    }

    #[test]
    fn test_error_route_to_unknown_node_rejected() {
        let result = WorkflowDefinition::from_json(json!({
            "id": "wf-1",
            "name": "Broken",
            "nodes": [{
                "id": "a",
                "type": "task",
                "label": "A",
                "on_error_next_node": "ghost",
            }],
        }));

        assert!(matches!(
            result,
            Err(DefinitionError::UnknownErrorRoute { target, .. }) if target == "ghost"
        ));
    }

    #[test]
    fn test_edge_branch_matching() {
        let yes = Edge {
            source: "c".to_string(),
            target: "a".to_string(),
            label: Some("Yes".to_string()),
        };
        let no = Edge {
            source: "c".to_string(),
            target: "b".to_string(),
            label: Some("FALSE".to_string()),
        };
        let unlabeled = Edge {
            source: "c".to_string(),
            target: "d".to_string(),
            label: None,
        };

        assert!(yes.matches_branch(true));
        assert!(!yes.matches_branch(false));
        assert!(no.matches_branch(false));
        assert!(!no.matches_branch(true));
        assert!(!unlabeled.matches_branch(true));
        assert!(!unlabeled.matches_branch(false));
    }
}
