// ABOUTME: Workflow definition module: the typed step graph the engine walks
// ABOUTME: Exports graph structures, node payloads, conditions, and validation

pub mod condition;
pub mod error;
pub mod node;
pub mod validation;
pub mod workflow;

pub use condition::{ComparisonOp, Condition};
pub use error::DefinitionError;
pub use node::{
    AiWorkerConfig, ConditionConfig, NodeKind, RetryPolicy, WebhookActionConfig, WorkflowNode,
};
pub use validation::{DefinitionValidator, ValidationReport};
pub use workflow::{Edge, Variables, WorkflowDefinition};
