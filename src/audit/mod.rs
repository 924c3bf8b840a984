// ABOUTME: Append-only audit sink for state-machine and executor events
// ABOUTME: Fire-and-forget: a sink failure never fails the transition it documents

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub id: String,
    pub actor: String,
    pub action: AuditAction,
    pub resource: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    WorkflowStarted,
    WorkflowProgressed,
    WorkflowCompleted,
    WorkflowApproved,
    WorkflowRejected,
    WorkflowRewound,
    WorkflowSuspended,
    NodeSucceeded,
    NodeFailed,
    NodeErrorRouted,
    TriggerReceived,
}

impl AuditEvent {
    pub fn new(actor: &str, action: AuditAction, resource: impl Into<String>, details: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            actor: actor.to_string(),
            action,
            resource: resource.into(),
            details,
            timestamp: Utc::now(),
        }
    }
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::WorkflowStarted => "workflow.start",
            AuditAction::WorkflowProgressed => "workflow.progress",
            AuditAction::WorkflowCompleted => "workflow.complete",
            AuditAction::WorkflowApproved => "workflow.approve",
            AuditAction::WorkflowRejected => "workflow.reject",
            AuditAction::WorkflowRewound => "workflow.rewind",
            AuditAction::WorkflowSuspended => "workflow.suspend",
            AuditAction::NodeSucceeded => "node.success",
            AuditAction::NodeFailed => "node.failure",
            AuditAction::NodeErrorRouted => "node.error_route",
            AuditAction::TriggerReceived => "trigger.received",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only event sink. Implementations own their failure handling;
/// `record` cannot report errors back to the state transition.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Sink that forwards events to the tracing subscriber.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, event: AuditEvent) {
        info!(
            target: "stagehand::audit",
            actor = %event.actor,
            action = event.action.as_str(),
            resource = %event.resource,
            details = %event.details,
            "audit event"
        );
    }
}

/// Sink that keeps events in memory, for tests and embedding.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn actions(&self) -> Vec<AuditAction> {
        self.events().into_iter().map(|e| e.action).collect()
    }

    pub fn count(&self, action: AuditAction) -> usize {
        self.events().iter().filter(|e| e.action == action).count()
    }
}

impl AuditSink for MemorySink {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_sink_captures_events() {
        let sink = MemorySink::new();

        sink.record(AuditEvent::new(
            "alice",
            AuditAction::WorkflowStarted,
            "task-1",
            json!({"workflow_id": "wf-1"}),
        ));
        sink.record(AuditEvent::new(
            "alice",
            AuditAction::WorkflowProgressed,
            "task-1",
            json!({}),
        ));

        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.count(AuditAction::WorkflowStarted), 1);
        assert_eq!(
            sink.actions(),
            vec![AuditAction::WorkflowStarted, AuditAction::WorkflowProgressed]
        );
    }

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::WorkflowStarted.as_str(), "workflow.start");
        assert_eq!(AuditAction::NodeErrorRouted.as_str(), "node.error_route");
        assert_eq!(format!("{}", AuditAction::WorkflowRewound), "workflow.rewind");
    }
}
