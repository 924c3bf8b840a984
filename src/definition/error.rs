// ABOUTME: Error types for workflow definition parsing and validation
// ABOUTME: Defines specific error types for the definition module operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("failed to parse workflow definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid condition expression '{expression}': {reason}")]
    InvalidCondition { expression: String, reason: String },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("edge '{edge_source}' -> '{target}' references unknown node '{node}'")]
    UnknownEdgeNode {
        edge_source: String,
        target: String,
        node: String,
    },

    #[error("error route on node '{node}' references unknown node '{target}'")]
    UnknownErrorRoute { node: String, target: String },

    #[error("workflow has no usable start node")]
    NoStartNode,
}

pub type Result<T> = std::result::Result<T, DefinitionError>;
