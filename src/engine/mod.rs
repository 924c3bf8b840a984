// ABOUTME: Workflow engine module: navigation, resilient execution, state machine
// ABOUTME: Exports the components that drive a task through its step graph

pub mod error;
pub mod executor;
pub mod machine;
pub mod navigator;

pub use error::{EngineError, Result};
pub use executor::{ExecutionOutcome, ResilientExecutor};
pub use machine::{ApprovalAction, WorkflowStateMachine};
pub use navigator::GraphNavigator;
