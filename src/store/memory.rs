// ABOUTME: In-memory store implementations for embedding and tests
// ABOUTME: HashMaps behind async RwLocks, one per collaborator trait

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{DefinitionStore, Result, TaskStore, TriggerStore};
use crate::definition::WorkflowDefinition;
use crate::state::{TaskRecord, TaskStatus};
use crate::trigger::WebhookTrigger;

#[derive(Default)]
pub struct InMemoryDefinitionStore {
    definitions: RwLock<HashMap<String, WorkflowDefinition>>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, definition: WorkflowDefinition) {
        self.definitions
            .write()
            .await
            .insert(definition.id.clone(), definition);
    }
}

#[async_trait]
impl DefinitionStore for InMemoryDefinitionStore {
    async fn get(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>> {
        Ok(self.definitions.read().await.get(workflow_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, TaskRecord>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, task_id: &str) -> Result<Option<TaskRecord>> {
        Ok(self.tasks.read().await.get(task_id).cloned())
    }

    async fn put(&self, record: TaskRecord) -> Result<()> {
        self.tasks.write().await.insert(record.id.clone(), record);
        Ok(())
    }

    async fn set_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        if let Some(record) = self.tasks.write().await.get_mut(task_id) {
            record.status = status;
            record.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTriggerStore {
    triggers: RwLock<HashMap<String, WebhookTrigger>>,
}

impl InMemoryTriggerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TriggerStore for InMemoryTriggerStore {
    async fn get(&self, trigger_id: &str) -> Result<Option<WebhookTrigger>> {
        Ok(self.triggers.read().await.get(trigger_id).cloned())
    }

    async fn put(&self, trigger: WebhookTrigger) -> Result<()> {
        self.triggers
            .write()
            .await
            .insert(trigger.id.clone(), trigger);
        Ok(())
    }
}
