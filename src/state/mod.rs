// ABOUTME: Execution state module: task records and the workflow_state aggregate
// ABOUTME: Exports the record types the state machine reads and writes

pub mod record;
pub mod workflow_state;

pub use record::{TaskRecord, TaskStatus};
pub use workflow_state::{
    CompletedStep, PendingApproval, RewindEntry, StateSnapshot, StepHistoryEntry, StepStatus,
    WorkflowState,
};
