// ABOUTME: Storage seams for the engine's external collaborators
// ABOUTME: Defines the definition/task/trigger store traits and their error type

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::definition::WorkflowDefinition;
use crate::state::{TaskRecord, TaskStatus};
use crate::trigger::WebhookTrigger;

pub use memory::{InMemoryDefinitionStore, InMemoryTaskStore, InMemoryTriggerStore};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Read-only access to workflow definitions. Definitions are immutable
/// while referenced by running tasks; the engine never writes them.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    async fn get(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>>;
}

/// Access to task execution records. `put` replaces the whole record and
/// must be atomic per record; the engine serializes its own
/// read-modify-write sequences per task id.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get(&self, task_id: &str) -> Result<Option<TaskRecord>>;

    async fn put(&self, record: TaskRecord) -> Result<()>;

    /// Narrow status write used by the executor when it suspends a task.
    async fn set_status(&self, task_id: &str, status: TaskStatus) -> Result<()>;
}

/// Access to inbound webhook trigger configurations.
#[async_trait]
pub trait TriggerStore: Send + Sync {
    async fn get(&self, trigger_id: &str) -> Result<Option<WebhookTrigger>>;

    async fn put(&self, trigger: WebhookTrigger) -> Result<()>;
}
