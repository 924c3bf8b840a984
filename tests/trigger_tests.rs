// ABOUTME: Integration tests for the inbound webhook trigger boundary
// ABOUTME: Payload mapping, trigger bookkeeping, and failure surfaces

mod common;

use common::{DefinitionBuilder, Harness};
use serde_json::json;
use std::sync::Arc;

use stagehand::audit::AuditAction;
use stagehand::state::TaskStatus;
use stagehand::store::TriggerStore;
use stagehand::trigger::{TriggerError, TriggerGateway, WebhookTrigger};

fn gateway(harness: &Harness) -> TriggerGateway {
    TriggerGateway::new(
        harness.triggers.clone(),
        harness.tasks.clone(),
        harness.machine.clone(),
        harness.audit.clone() as Arc<dyn stagehand::audit::AuditSink>,
    )
}

#[tokio::test]
async fn test_receive_starts_workflow_with_mapped_variables() {
    let harness = Harness::new();
    harness
        .seed_definition(
            DefinitionBuilder::new("wf-intake", "Order intake")
                .add_task("triage", "Triage")
                .add_condition("gate", "Amount gate", "amount > 5000")
                .add_task("escalate", "Escalate")
                .add_task("auto", "Auto approve")
                .add_edge("triage", "gate")
                .add_labeled_edge("gate", "escalate", "yes")
                .add_labeled_edge("gate", "auto", "no")
                .build(),
        )
        .await;

    let trigger = WebhookTrigger::new("Order intake", "wf-intake")
        .with_mapping("amount", "order.total")
        .with_mapping("customer", "order.customer.name")
        .with_mapping("missing", "order.nothing.here");
    let trigger_id = trigger.id.clone();
    harness.triggers.put(trigger).await.unwrap();

    let gateway = gateway(&harness);
    let receipt = gateway
        .receive(
            &trigger_id,
            json!({"order": {"total": 9000, "customer": {"name": "ACME"}}}),
        )
        .await
        .unwrap();

    assert!(receipt.workflow_started);

    let record = harness.task(&receipt.task_id).await;
    assert_eq!(record.status, TaskStatus::InProgress);
    assert_eq!(record.title, "Webhook-triggered: Order intake");
    assert_eq!(record.workflow_id.as_deref(), Some("wf-intake"));
    assert_eq!(
        record.workflow_state.variables.get("amount"),
        Some(&json!(9000))
    );
    assert_eq!(
        record.workflow_state.variables.get("customer"),
        Some(&json!("ACME"))
    );
    assert!(!record.workflow_state.variables.contains_key("missing"));
    // The raw payload is kept on the task for later inspection.
    assert!(record.metadata.contains_key("webhook_payload"));

    // Bookkeeping is owned by the gateway.
    let stored = harness.triggers.get(&trigger_id).await.unwrap().unwrap();
    assert_eq!(stored.trigger_count, 1);
    assert!(stored.last_triggered.is_some());
    assert_eq!(harness.audit.count(AuditAction::TriggerReceived), 1);

    // The mapped variables drive condition routing on later progress.
    let state = harness
        .machine
        .progress(&receipt.task_id, "alice", None, None)
        .await
        .unwrap();
    assert!(state.step_history.iter().any(|e| e.step_id == "escalate"));
}

#[tokio::test]
async fn test_receive_unknown_trigger() {
    let harness = Harness::new();
    let gateway = gateway(&harness);

    let result = gateway.receive("ghost", json!({})).await;
    assert!(matches!(result, Err(TriggerError::NotFound(id)) if id == "ghost"));
}

#[tokio::test]
async fn test_receive_inactive_trigger() {
    let harness = Harness::new();
    let mut trigger = WebhookTrigger::new("Disabled", "wf-any");
    trigger.is_active = false;
    let trigger_id = trigger.id.clone();
    harness.triggers.put(trigger).await.unwrap();

    let gateway = gateway(&harness);
    let result = gateway.receive(&trigger_id, json!({})).await;

    assert!(matches!(result, Err(TriggerError::Inactive(_))));

    // A refused event is not counted.
    let stored = harness.triggers.get(&trigger_id).await.unwrap().unwrap();
    assert_eq!(stored.trigger_count, 0);
}

#[tokio::test]
async fn test_receive_with_missing_workflow_keeps_the_task() {
    let harness = Harness::new();
    let trigger = WebhookTrigger::new("Dangling", "wf-does-not-exist");
    let trigger_id = trigger.id.clone();
    harness.triggers.put(trigger).await.unwrap();

    let gateway = gateway(&harness);
    let receipt = gateway.receive(&trigger_id, json!({"a": 1})).await.unwrap();

    assert!(!receipt.workflow_started);

    // The task record exists even though the workflow never started.
    let record = harness.task(&receipt.task_id).await;
    assert_eq!(record.status, TaskStatus::New);
    assert!(record.workflow_state.current_step.is_none());

    // The trigger still counts the delivery.
    let stored = harness.triggers.get(&trigger_id).await.unwrap().unwrap();
    assert_eq!(stored.trigger_count, 1);
}

#[tokio::test]
async fn test_repeated_deliveries_increment_the_counter() {
    let harness = Harness::new();
    harness
        .seed_definition(
            DefinitionBuilder::new("wf-count", "Counted")
                .add_task("only", "Only step")
                .build(),
        )
        .await;

    let trigger = WebhookTrigger::new("Counted", "wf-count");
    let trigger_id = trigger.id.clone();
    harness.triggers.put(trigger).await.unwrap();

    let gateway = gateway(&harness);
    let first = gateway.receive(&trigger_id, json!({})).await.unwrap();
    let second = gateway.receive(&trigger_id, json!({})).await.unwrap();

    assert_ne!(first.task_id, second.task_id);

    let stored = harness.triggers.get(&trigger_id).await.unwrap().unwrap();
    assert_eq!(stored.trigger_count, 2);
}
