// ABOUTME: Error taxonomy for workflow engine operations
// ABOUTME: NotFound variants surface to callers; Suspended is terminal until resumed

use thiserror::Error;

use crate::definition::DefinitionError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("workflow '{workflow_id}' has no usable start node")]
    InvalidDefinition { workflow_id: String },

    #[error("task '{0}' has no active workflow")]
    NoActiveWorkflow(String),

    #[error("no pending approval for step '{step_id}' assigned to '{actor}'")]
    ApprovalNotFound { step_id: String, actor: String },

    #[error("step '{0}' does not appear in the workflow history")]
    TargetStepNotFound(String),

    #[error("current step '{step_id}' is missing from workflow '{workflow_id}'")]
    UnknownStep {
        workflow_id: String,
        step_id: String,
    },

    #[error("task '{task_id}' is suspended: {reason}")]
    Suspended { task_id: String, reason: String },

    #[error("workflow for task '{task_id}' made {limit} transitions without reaching a gate")]
    RunawayWorkflow { task_id: String, limit: usize },

    #[error("definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
