// ABOUTME: The workflow state machine: start, progress, approve, reject, rewind
// ABOUTME: Sole mutator of workflow_state; serializes all writes per task id

use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};

use super::error::{EngineError, Result};
use super::executor::{ExecutionOutcome, ResilientExecutor};
use super::navigator::GraphNavigator;
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::definition::{Variables, WorkflowDefinition};
use crate::state::{StepStatus, TaskRecord, TaskStatus, WorkflowState};
use crate::store::{DefinitionStore, TaskStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    Approve,
    Reject,
}

pub struct WorkflowStateMachine {
    definitions: Arc<dyn DefinitionStore>,
    tasks: Arc<dyn TaskStore>,
    executor: ResilientExecutor,
    audit: Arc<dyn AuditSink>,
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WorkflowStateMachine {
    pub fn new(
        definitions: Arc<dyn DefinitionStore>,
        tasks: Arc<dyn TaskStore>,
        executor: ResilientExecutor,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            definitions,
            tasks,
            executor,
            audit,
            locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Attach a workflow to a task and position it on the start node.
    /// Starting an already-started task overwrites its workflow state:
    /// an intentional reset, not a no-op.
    #[instrument(skip(self, initial_variables))]
    pub async fn start(
        &self,
        task_id: &str,
        workflow_id: &str,
        actor: &str,
        initial_variables: Option<Variables>,
    ) -> Result<WorkflowState> {
        let _guard = self.task_guard(task_id).await;

        let mut record = self.fetch_task(task_id).await?;
        let definition = self.fetch_definition(workflow_id).await?;

        let start = GraphNavigator::start_node(&definition).ok_or_else(|| {
            EngineError::InvalidDefinition {
                workflow_id: workflow_id.to_string(),
            }
        })?;

        let mut variables = definition.variables.clone();
        if let Some(initial) = initial_variables {
            variables.extend(initial);
        }

        let state = WorkflowState::started(start, actor, variables);
        record.workflow_id = Some(workflow_id.to_string());
        record.workflow_state = state.clone();
        record.status = TaskStatus::InProgress;
        record.completed_at = None;
        record.touch();

        self.tasks.put(record).await?;
        self.audit.record(AuditEvent::new(
            actor,
            AuditAction::WorkflowStarted,
            format!("task-{}", task_id),
            json!({"workflow_id": workflow_id, "start_step": start.id}),
        ));
        info!(task_id, workflow_id, start_step = %start.id, "workflow started");

        Ok(state)
    }

    /// Complete the current step and run the workflow forward until it
    /// parks on an approval gate, suspends, or finishes.
    #[instrument(skip(self, comment, data))]
    pub async fn progress(
        &self,
        task_id: &str,
        actor: &str,
        comment: Option<String>,
        data: Option<Variables>,
    ) -> Result<WorkflowState> {
        let _guard = self.task_guard(task_id).await;

        let mut record = self.fetch_task(task_id).await?;
        if record.status == TaskStatus::Suspended {
            return Err(EngineError::Suspended {
                task_id: task_id.to_string(),
                reason: "workflow is suspended; rewind or restart to resume".to_string(),
            });
        }
        if !record.workflow_state.is_active() {
            return Err(EngineError::NoActiveWorkflow(task_id.to_string()));
        }
        let workflow_id = record
            .workflow_id
            .clone()
            .ok_or_else(|| EngineError::NoActiveWorkflow(task_id.to_string()))?;
        let definition = self.fetch_definition(&workflow_id).await?;

        if let Some(data) = data {
            record.workflow_state.merge_variables(data);
        }

        self.run_and_persist(record, &definition, actor, comment)
            .await
    }

    /// Resolve a pending approval. Approving re-enters the progress
    /// continuation past the gate; rejecting freezes the workflow on hold.
    #[instrument(skip(self, comment))]
    pub async fn approve_step(
        &self,
        task_id: &str,
        step_id: &str,
        actor: &str,
        action: ApprovalAction,
        comment: Option<String>,
    ) -> Result<WorkflowState> {
        let _guard = self.task_guard(task_id).await;

        let mut record = self.fetch_task(task_id).await?;
        let approval = record
            .workflow_state
            .take_approval(step_id, actor)
            .ok_or_else(|| EngineError::ApprovalNotFound {
                step_id: step_id.to_string(),
                actor: actor.to_string(),
            })?;

        match action {
            ApprovalAction::Approve => {
                record.workflow_state.record_resolution(
                    &approval,
                    StepStatus::Approve,
                    actor,
                    comment.clone(),
                );
                self.audit.record(AuditEvent::new(
                    actor,
                    AuditAction::WorkflowApproved,
                    format!("task-{}", task_id),
                    json!({"step_id": step_id}),
                ));
                info!(task_id, step_id, "approval granted");

                let workflow_id = record
                    .workflow_id
                    .clone()
                    .ok_or_else(|| EngineError::NoActiveWorkflow(task_id.to_string()))?;
                let definition = self.fetch_definition(&workflow_id).await?;

                let continuation = Some(format!("Approved: {}", comment.unwrap_or_default()));
                self.run_and_persist(record, &definition, actor, continuation)
                    .await
            }
            ApprovalAction::Reject => {
                record.workflow_state.record_resolution(
                    &approval,
                    StepStatus::Reject,
                    actor,
                    comment,
                );
                record.workflow_state.halt();
                record.status = TaskStatus::OnHold;
                record.touch();

                let state = record.workflow_state.clone();
                self.tasks.put(record).await?;
                self.audit.record(AuditEvent::new(
                    actor,
                    AuditAction::WorkflowRejected,
                    format!("task-{}", task_id),
                    json!({"step_id": step_id}),
                ));
                info!(task_id, step_id, "approval rejected, task on hold");

                Ok(state)
            }
        }
    }

    /// Move the workflow back to a previously visited step. Bookkeeping
    /// only: side effects between the target and the old position are
    /// neither undone nor re-executed.
    #[instrument(skip(self, reason))]
    pub async fn rewind(
        &self,
        task_id: &str,
        target_step_id: &str,
        actor: &str,
        reason: &str,
    ) -> Result<WorkflowState> {
        let _guard = self.task_guard(task_id).await;

        let mut record = self.fetch_task(task_id).await?;
        let target_index = record
            .workflow_state
            .last_occurrence(target_step_id)
            .ok_or_else(|| EngineError::TargetStepNotFound(target_step_id.to_string()))?;

        let from_step = record.workflow_state.current_step.clone();
        record.workflow_state.rewind_to(target_index, actor, reason);
        record.status = TaskStatus::InProgress;
        record.completed_at = None;
        record.touch();

        let state = record.workflow_state.clone();
        self.tasks.put(record).await?;
        self.audit.record(AuditEvent::new(
            actor,
            AuditAction::WorkflowRewound,
            format!("task-{}", task_id),
            json!({
                "from_step": from_step,
                "to_step": target_step_id,
                "reason": reason,
            }),
        ));
        info!(task_id, target_step_id, "workflow rewound");

        Ok(state)
    }

    /// Run the continuation, then persist. The record is written on success
    /// and on suspension (where the store must reflect the suspended task);
    /// any other failure leaves the stored record untouched.
    async fn run_and_persist(
        &self,
        mut record: TaskRecord,
        definition: &WorkflowDefinition,
        actor: &str,
        comment: Option<String>,
    ) -> Result<WorkflowState> {
        let task_id = record.id.clone();
        let result = self
            .run_continuation(&mut record, definition, actor, comment)
            .await;
        record.touch();

        match result {
            Ok(()) => {
                let completed = record.status == TaskStatus::Completed;
                let state = record.workflow_state.clone();
                self.tasks.put(record).await?;
                let action = if completed {
                    AuditAction::WorkflowCompleted
                } else {
                    AuditAction::WorkflowProgressed
                };
                self.audit.record(AuditEvent::new(
                    actor,
                    action,
                    format!("task-{}", task_id),
                    json!({"current_step": state.current_step}),
                ));
                Ok(state)
            }
            Err(err @ EngineError::Suspended { .. }) => {
                self.tasks.put(record).await?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// The automated continuation: complete the current step, navigate, and
    /// keep going through non-approval nodes (executing their side effects)
    /// until the workflow parks on a gate, suspends, or ends. A hop budget
    /// bounds error-route cycles.
    async fn run_continuation(
        &self,
        record: &mut TaskRecord,
        definition: &WorkflowDefinition,
        actor: &str,
        mut comment: Option<String>,
    ) -> Result<()> {
        let limit = 2 * (definition.nodes.len() + definition.edges.len()) + 8;
        let mut hops = 0usize;

        loop {
            hops += 1;
            if hops > limit {
                return Err(EngineError::RunawayWorkflow {
                    task_id: record.id.clone(),
                    limit,
                });
            }

            let current_id = record
                .workflow_state
                .current_step
                .clone()
                .ok_or_else(|| EngineError::NoActiveWorkflow(record.id.clone()))?;
            let current =
                definition
                    .node(&current_id)
                    .ok_or_else(|| EngineError::UnknownStep {
                        workflow_id: definition.id.clone(),
                        step_id: current_id.clone(),
                    })?;

            record
                .workflow_state
                .complete_step(current, actor, comment.take());

            let Some(next) =
                GraphNavigator::next(definition, &current_id, &record.workflow_state.variables)
            else {
                record.workflow_state.finish();
                record.status = TaskStatus::Completed;
                record.completed_at = record.workflow_state.completed_at;
                info!(task_id = %record.id, "workflow completed");
                return Ok(());
            };

            let mut target = next;
            loop {
                hops += 1;
                if hops > limit {
                    return Err(EngineError::RunawayWorkflow {
                        task_id: record.id.clone(),
                        limit,
                    });
                }

                if target.kind.is_approval() {
                    record.workflow_state.park_on_approval(target, actor);
                    record.status = TaskStatus::InProgress;
                    info!(
                        task_id = %record.id,
                        step_id = %target.id,
                        "workflow awaiting approval"
                    );
                    return Ok(());
                }

                record.workflow_state.advance_to(target, actor);

                let outcome = self
                    .executor
                    .execute(&record.id, target, &record.workflow_state.variables, actor)
                    .await?;

                match outcome {
                    ExecutionOutcome::Success(output) => {
                        record.workflow_state.merge_variables(output.variables);
                        break;
                    }
                    ExecutionOutcome::ErrorRouted { next_node_id, error } => {
                        warn!(
                            task_id = %record.id,
                            from = %target.id,
                            to = %next_node_id,
                            error = %error,
                            "node failed, following error route"
                        );
                        target = definition.node(&next_node_id).ok_or_else(|| {
                            EngineError::UnknownStep {
                                workflow_id: definition.id.clone(),
                                step_id: next_node_id.clone(),
                            }
                        })?;
                    }
                    ExecutionOutcome::Suspended { error } => {
                        record.status = TaskStatus::Suspended;
                        return Err(EngineError::Suspended {
                            task_id: record.id.clone(),
                            reason: error,
                        });
                    }
                }
            }
        }
    }

    async fn fetch_task(&self, task_id: &str) -> Result<TaskRecord> {
        self.tasks
            .get(task_id)
            .await?
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))
    }

    async fn fetch_definition(&self, workflow_id: &str) -> Result<WorkflowDefinition> {
        self.definitions
            .get(workflow_id)
            .await?
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))
    }

    /// Per-task serialization point: every operation holds this guard for
    /// its whole read-modify-write, so concurrent callers on one task
    /// cannot interleave. Distinct tasks proceed independently.
    async fn task_guard(&self, task_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(task_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

impl fmt::Debug for WorkflowStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowStateMachine").finish()
    }
}

impl ApprovalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalAction::Approve => "approve",
            ApprovalAction::Reject => "reject",
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
