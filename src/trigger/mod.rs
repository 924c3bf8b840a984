// ABOUTME: Inbound webhook boundary: trigger configs and workflow kick-off
// ABOUTME: Maps payload fields to variables via dotted paths, then starts the workflow

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::definition::Variables;
use crate::engine::{EngineError, WorkflowStateMachine};
use crate::state::TaskRecord;
use crate::store::{StoreError, TaskStore, TriggerStore};

pub const SYSTEM_ACTOR: &str = "system";

/// Inbound webhook trigger configuration. `payload_mapping` maps a target
/// variable name to a dotted path into the raw payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookTrigger {
    pub id: String,
    pub name: String,
    pub workflow_id: String,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub payload_mapping: IndexMap<String, String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trigger_count: u64,
}

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("webhook trigger not found: {0}")]
    NotFound(String),

    #[error("webhook trigger '{0}' is disabled")]
    Inactive(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, TriggerError>;

#[derive(Debug, Clone)]
pub struct TriggerReceipt {
    pub task_id: String,
    pub workflow_started: bool,
}

/// The ingestion boundary in front of the state machine. Owns the
/// per-trigger bookkeeping (count and last-triggered timestamp); the
/// machine never sees triggers.
pub struct TriggerGateway {
    triggers: Arc<dyn TriggerStore>,
    tasks: Arc<dyn TaskStore>,
    machine: Arc<WorkflowStateMachine>,
    audit: Arc<dyn AuditSink>,
}

impl WebhookTrigger {
    pub fn new(name: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            workflow_id: workflow_id.into(),
            is_active: true,
            payload_mapping: IndexMap::new(),
            created_at: Utc::now(),
            last_triggered: None,
            trigger_count: 0,
        }
    }

    pub fn with_mapping(mut self, variable: impl Into<String>, path: impl Into<String>) -> Self {
        self.payload_mapping.insert(variable.into(), path.into());
        self
    }
}

impl TriggerGateway {
    pub fn new(
        triggers: Arc<dyn TriggerStore>,
        tasks: Arc<dyn TaskStore>,
        machine: Arc<WorkflowStateMachine>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            triggers,
            tasks,
            machine,
            audit,
        }
    }

    /// Receive an inbound event: create a task, start the trigger's
    /// workflow with the mapped variables, and bump the trigger stats.
    /// The task survives even when the workflow fails to start.
    pub async fn receive(&self, trigger_id: &str, payload: Value) -> Result<TriggerReceipt> {
        let mut trigger = self
            .triggers
            .get(trigger_id)
            .await?
            .ok_or_else(|| TriggerError::NotFound(trigger_id.to_string()))?;
        if !trigger.is_active {
            return Err(TriggerError::Inactive(trigger_id.to_string()));
        }

        let variables = resolve_payload_mapping(&trigger.payload_mapping, &payload);

        let mut task = TaskRecord::new(format!("Webhook-triggered: {}", trigger.name));
        task.description = Some(format!("Triggered by webhook {}", trigger.id));
        task.workflow_id = Some(trigger.workflow_id.clone());
        task.metadata
            .insert("webhook_payload".to_string(), payload.clone());
        let task_id = task.id.clone();
        self.tasks.put(task).await?;

        let workflow_started = match self
            .machine
            .start(&task_id, &trigger.workflow_id, SYSTEM_ACTOR, Some(variables))
            .await
        {
            Ok(_) => true,
            Err(err) => {
                warn!(trigger_id, task_id, error = %err, "trigger received but workflow failed to start");
                false
            }
        };

        trigger.trigger_count += 1;
        trigger.last_triggered = Some(Utc::now());
        self.triggers.put(trigger).await?;

        self.audit.record(AuditEvent::new(
            SYSTEM_ACTOR,
            AuditAction::TriggerReceived,
            format!("trigger-{}", trigger_id),
            json!({"task_id": task_id, "workflow_started": workflow_started}),
        ));
        info!(trigger_id, task_id, workflow_started, "webhook trigger received");

        Ok(TriggerReceipt {
            task_id,
            workflow_started,
        })
    }
}

/// Resolve each mapping entry against the payload; mappings whose path
/// hits an absent segment are omitted rather than defaulted.
pub fn resolve_payload_mapping(
    mapping: &IndexMap<String, String>,
    payload: &Value,
) -> Variables {
    let mut variables = Variables::new();
    for (variable, path) in mapping {
        if let Some(value) = lookup_path(payload, path) {
            variables.insert(variable.clone(), value.clone());
        }
    }
    variables
}

fn lookup_path<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    let mut value = payload;
    for segment in path.split('.') {
        value = value.get(segment)?;
    }
    Some(value)
}

fn default_is_active() -> bool {
    true
}
