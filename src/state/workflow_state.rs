// ABOUTME: The workflow_state aggregate: current position, history, approvals
// ABOUTME: Transitions are pure mutations; persistence is the machine's job

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::definition::{Variables, WorkflowNode};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowState {
    pub current_step: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub variables: Variables,
    pub step_history: Vec<StepHistoryEntry>,
    pub pending_approvals: Vec<PendingApproval>,
    pub completed_steps: Vec<CompletedStep>,
    pub rewind_history: Vec<RewindEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Started,
    PendingApproval,
    Approve,
    Reject,
    Rewound,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepHistoryEntry {
    pub step_id: String,
    pub step_name: String,
    pub status: StepStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub actor: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingApproval {
    pub step_id: String,
    pub step_name: String,
    pub assigned_to: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedStep {
    pub step_id: String,
    pub step_name: String,
    pub completed_at: DateTime<Utc>,
    pub completed_by: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// One rewind ledger entry. The snapshot excludes the ledger itself so the
/// ledger grows linearly with rewinds instead of nesting recursively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewindEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub reason: String,
    pub prior_state: StateSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub current_step: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub variables: Variables,
    pub step_history: Vec<StepHistoryEntry>,
    pub pending_approvals: Vec<PendingApproval>,
    pub completed_steps: Vec<CompletedStep>,
}

impl WorkflowState {
    /// Fresh state positioned on the start node with one `started` history
    /// row, as `start` creates it.
    pub fn started(start: &WorkflowNode, actor: &str, variables: Variables) -> Self {
        let now = Utc::now();
        Self {
            current_step: Some(start.id.clone()),
            started_at: Some(now),
            completed_at: None,
            variables,
            step_history: vec![StepHistoryEntry {
                step_id: start.id.clone(),
                step_name: start.label.clone(),
                status: StepStatus::Started,
                started_at: Some(now),
                completed_at: None,
                actor: actor.to_string(),
                comment: None,
            }],
            pending_approvals: Vec::new(),
            completed_steps: Vec::new(),
            rewind_history: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.current_step.is_some()
    }

    pub fn merge_variables(&mut self, updates: Variables) {
        self.variables.extend(updates);
    }

    /// Record the current node as completed.
    pub fn complete_step(&mut self, node: &WorkflowNode, actor: &str, comment: Option<String>) {
        self.completed_steps.push(CompletedStep {
            step_id: node.id.clone(),
            step_name: node.label.clone(),
            completed_at: Utc::now(),
            completed_by: actor.to_string(),
            comment,
        });
    }

    /// Move onto a node and append its `started` history row.
    pub fn advance_to(&mut self, node: &WorkflowNode, actor: &str) {
        self.current_step = Some(node.id.clone());
        self.step_history.push(StepHistoryEntry {
            step_id: node.id.clone(),
            step_name: node.label.clone(),
            status: StepStatus::Started,
            started_at: Some(Utc::now()),
            completed_at: None,
            actor: actor.to_string(),
            comment: None,
        });
    }

    /// Stop on an approval gate: the gate becomes the current step, gains a
    /// pending approval assigned to the acting actor, and a
    /// `pending_approval` history row.
    pub fn park_on_approval(&mut self, node: &WorkflowNode, actor: &str) {
        let now = Utc::now();
        self.current_step = Some(node.id.clone());
        self.pending_approvals.push(PendingApproval {
            step_id: node.id.clone(),
            step_name: node.label.clone(),
            assigned_to: actor.to_string(),
            requested_at: now,
        });
        self.step_history.push(StepHistoryEntry {
            step_id: node.id.clone(),
            step_name: node.label.clone(),
            status: StepStatus::PendingApproval,
            started_at: Some(now),
            completed_at: None,
            actor: actor.to_string(),
            comment: None,
        });
    }

    /// Remove the pending approval matching the step and assignee, if any.
    pub fn take_approval(&mut self, step_id: &str, actor: &str) -> Option<PendingApproval> {
        let index = self
            .pending_approvals
            .iter()
            .position(|p| p.step_id == step_id && p.assigned_to == actor)?;
        Some(self.pending_approvals.remove(index))
    }

    /// Append the history row documenting an approval decision.
    pub fn record_resolution(
        &mut self,
        approval: &PendingApproval,
        status: StepStatus,
        actor: &str,
        comment: Option<String>,
    ) {
        self.step_history.push(StepHistoryEntry {
            step_id: approval.step_id.clone(),
            step_name: approval.step_name.clone(),
            status,
            started_at: None,
            completed_at: Some(Utc::now()),
            actor: actor.to_string(),
            comment,
        });
    }

    /// Terminal completion: no current step, stamped completed_at.
    pub fn finish(&mut self) {
        self.current_step = None;
        self.completed_at = Some(Utc::now());
    }

    /// Freeze in place after a rejection: the workflow keeps its history but
    /// has no current step until restarted or rewound.
    pub fn halt(&mut self) {
        self.current_step = None;
    }

    /// Index of the most recent history entry for the given step.
    pub fn last_occurrence(&self, step_id: &str) -> Option<usize> {
        self.step_history.iter().rposition(|e| e.step_id == step_id)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            current_step: self.current_step.clone(),
            started_at: self.started_at,
            completed_at: self.completed_at,
            variables: self.variables.clone(),
            step_history: self.step_history.clone(),
            pending_approvals: self.pending_approvals.clone(),
            completed_steps: self.completed_steps.clone(),
        }
    }

    /// Rewind to the history entry at `history_index`: snapshot the prior
    /// state into the ledger, truncate history to the target (plus a
    /// `rewound` row), drop completions from the target's own completion
    /// onward, clear pending approvals, and keep variables as they are.
    /// Side effects between the target and the old position are not undone
    /// or re-run.
    pub fn rewind_to(&mut self, history_index: usize, actor: &str, reason: &str) {
        let now = Utc::now();
        let target = self.step_history[history_index].clone();

        self.rewind_history.push(RewindEntry {
            timestamp: now,
            actor: actor.to_string(),
            reason: reason.to_string(),
            prior_state: self.snapshot(),
        });

        self.step_history.truncate(history_index + 1);
        if let Some(pos) = self
            .completed_steps
            .iter()
            .rposition(|s| s.step_id == target.step_id)
        {
            self.completed_steps.truncate(pos);
        }
        self.pending_approvals.clear();
        self.completed_at = None;
        self.current_step = Some(target.step_id.clone());

        self.step_history.push(StepHistoryEntry {
            step_id: target.step_id,
            step_name: target.step_name,
            status: StepStatus::Rewound,
            started_at: Some(now),
            completed_at: None,
            actor: actor.to_string(),
            comment: Some(reason.to_string()),
        });
    }
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Started => "started",
            StepStatus::PendingApproval => "pending_approval",
            StepStatus::Approve => "approve",
            StepStatus::Reject => "reject",
            StepStatus::Rewound => "rewound",
            StepStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
