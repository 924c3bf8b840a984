// ABOUTME: Workflow node types and their per-kind configuration payloads
// ABOUTME: Defines node kinds, retry policy, and webhook/ai-worker/condition configs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use super::condition::Condition;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    #[serde(default)]
    pub on_error_next_node: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Node kind plus its type-specific `data` payload. The wire field is
/// `type`; malformed payloads (including unparseable conditions) are
/// rejected when the definition is deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Task,
    Approval,
    Notification,
    Condition { data: ConditionConfig },
    WebhookAction { data: WebhookActionConfig },
    AiWorker { data: AiWorkerConfig },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub condition: Condition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookActionConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body_template: String,
    #[serde(default = "default_webhook_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiWorkerConfig {
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_output_variable")]
    pub output_variable: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_seconds: u64,
    pub backoff: bool,
}

impl WorkflowNode {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Task => "task",
            NodeKind::Approval => "approval",
            NodeKind::Notification => "notification",
            NodeKind::Condition { .. } => "condition",
            NodeKind::WebhookAction { .. } => "webhook_action",
            NodeKind::AiWorker { .. } => "ai_worker",
        }
    }

    pub fn is_approval(&self) -> bool {
        matches!(self, NodeKind::Approval)
    }

    pub fn is_condition(&self) -> bool {
        matches!(self, NodeKind::Condition { .. })
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl RetryPolicy {
    /// Number of attempts the executor will make, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait after the given failed attempt (1-indexed): the base delay,
    /// doubled per prior failure when backoff is enabled. The first retry
    /// waits the base delay, not zero.
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let factor = if self.backoff {
            2u64.saturating_pow(failed_attempt.saturating_sub(1))
        } else {
            1
        };
        Duration::from_secs(self.delay_seconds.saturating_mul(factor))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_seconds: default_delay_seconds(),
            backoff: default_backoff(),
        }
    }
}

// Default value functions
fn default_timeout_seconds() -> u64 {
    300
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_webhook_timeout_seconds() -> u64 {
    30
}

fn default_follow_redirects() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_output_variable() -> String {
    "ai_response".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_seconds() -> u64 {
    60
}

fn default_backoff() -> bool {
    true
}
