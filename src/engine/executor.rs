// ABOUTME: Resilient node executor: bounded retries, backoff, timeout per attempt
// ABOUTME: Exhaustion routes to the error node or suspends the owning task

use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use super::error::Result;
use crate::actions::{ActionDispatcher, ActionError, ActionOutput};
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::definition::{Variables, WorkflowNode};
use crate::state::TaskStatus;
use crate::store::TaskStore;

/// Outcome of executing one node to completion of its retry policy.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// An attempt succeeded; the caller merges any proposed variables.
    Success(ActionOutput),
    /// Retries exhausted with an error route configured: a normal
    /// transition to that node, not an exceptional state.
    ErrorRouted { next_node_id: String, error: String },
    /// Retries exhausted with no error route; the owning task has been
    /// marked suspended and a human must intervene.
    Suspended { error: String },
}

pub struct ResilientExecutor {
    tasks: Arc<dyn TaskStore>,
    audit: Arc<dyn AuditSink>,
    dispatcher: ActionDispatcher,
}

impl ResilientExecutor {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        audit: Arc<dyn AuditSink>,
        dispatcher: ActionDispatcher,
    ) -> Self {
        Self {
            tasks,
            audit,
            dispatcher,
        }
    }

    /// Execute a node's side effect with the node's retry policy.
    pub async fn execute(
        &self,
        task_id: &str,
        node: &WorkflowNode,
        variables: &Variables,
        actor: &str,
    ) -> Result<ExecutionOutcome> {
        self.execute_with(task_id, node, actor, || {
            self.dispatcher.run(node, variables)
        })
        .await
    }

    /// Retry loop around an injectable attempt. Each attempt is bounded by
    /// the node's timeout; a timeout is an ordinary attempt failure. Waits
    /// between attempts follow the retry policy and are cooperative
    /// suspension points, never thread blocks.
    pub async fn execute_with<F, Fut>(
        &self,
        task_id: &str,
        node: &WorkflowNode,
        actor: &str,
        attempt_fn: F,
    ) -> Result<ExecutionOutcome>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<ActionOutput, ActionError>>,
    {
        let policy = &node.retry_policy;
        let budget = node.timeout();
        let mut last_error = String::new();

        for attempt in 1..=policy.attempts() {
            let result = match timeout(budget, attempt_fn()).await {
                Ok(result) => result,
                Err(_) => Err(ActionError::Timeout(budget)),
            };

            match result {
                Ok(output) => {
                    debug!(
                        task_id,
                        node_id = %node.id,
                        attempt,
                        "node executed successfully"
                    );
                    self.audit.record(AuditEvent::new(
                        actor,
                        AuditAction::NodeSucceeded,
                        format!("task-{}", task_id),
                        json!({
                            "node_id": node.id,
                            "node_kind": node.kind.name(),
                            "attempt": attempt,
                        }),
                    ));
                    return Ok(ExecutionOutcome::Success(output));
                }
                Err(err) => {
                    let message = err.to_string();
                    warn!(
                        task_id,
                        node_id = %node.id,
                        attempt,
                        max_attempts = policy.attempts(),
                        error = %message,
                        "node attempt failed"
                    );
                    self.audit.record(AuditEvent::new(
                        actor,
                        AuditAction::NodeFailed,
                        format!("task-{}", task_id),
                        json!({
                            "node_id": node.id,
                            "node_kind": node.kind.name(),
                            "attempt": attempt,
                            "error": message,
                        }),
                    ));
                    last_error = message;

                    if attempt < policy.attempts() {
                        let delay = policy.delay_for(attempt);
                        debug!(task_id, node_id = %node.id, ?delay, "waiting before retry");
                        sleep(delay).await;
                    }
                }
            }
        }

        if let Some(next_node_id) = &node.on_error_next_node {
            info!(
                task_id,
                node_id = %node.id,
                to_node = %next_node_id,
                "retries exhausted, routing to error node"
            );
            self.audit.record(AuditEvent::new(
                actor,
                AuditAction::NodeErrorRouted,
                format!("task-{}", task_id),
                json!({
                    "from_node": node.id,
                    "to_node": next_node_id,
                    "error": last_error,
                }),
            ));
            return Ok(ExecutionOutcome::ErrorRouted {
                next_node_id: next_node_id.clone(),
                error: last_error,
            });
        }

        error!(
            task_id,
            node_id = %node.id,
            error = %last_error,
            "retries exhausted with no error route, suspending task"
        );
        self.tasks.set_status(task_id, TaskStatus::Suspended).await?;
        self.audit.record(AuditEvent::new(
            actor,
            AuditAction::WorkflowSuspended,
            format!("task-{}", task_id),
            json!({"node_id": node.id, "reason": last_error}),
        ));

        Ok(ExecutionOutcome::Suspended { error: last_error })
    }
}
