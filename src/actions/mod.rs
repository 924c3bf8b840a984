// ABOUTME: Node side-effect implementations dispatched by node kind
// ABOUTME: Webhook and generative-text calls; every other kind is a no-op

pub mod ai_worker;
pub mod webhook;

use serde_json::Value;
use thiserror::Error;

pub use ai_worker::AiClient;

use crate::config::EngineConfig;
use crate::definition::{NodeKind, Variables, WorkflowNode};
use crate::template::{TemplateEngine, TemplateError};

/// What a single successful attempt produced: opaque details for the audit
/// trail plus variable updates the caller must merge into the workflow
/// state.
#[derive(Debug, Clone)]
pub struct ActionOutput {
    pub details: Value,
    pub variables: Variables,
}

impl Default for ActionOutput {
    fn default() -> Self {
        Self {
            details: Value::Null,
            variables: Variables::new(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("template render error: {0}")]
    Template(#[from] TemplateError),

    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("generative backend returned no choices")]
    EmptyCompletion,

    #[error("attempt timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, ActionError>;

/// Maps a node to its side effect. Plain task, approval, notification, and
/// condition nodes have none: their attempt always succeeds. This is the
/// extension point for future node kinds.
pub struct ActionDispatcher {
    template: TemplateEngine,
    ai: AiClient,
}

impl ActionDispatcher {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            template: TemplateEngine::new(),
            ai: AiClient::new(&config.ai)?,
        })
    }

    /// Run one attempt of the node's side effect.
    pub async fn run(&self, node: &WorkflowNode, variables: &Variables) -> Result<ActionOutput> {
        match &node.kind {
            NodeKind::WebhookAction { data } => {
                webhook::execute(&self.template, data, variables).await
            }
            NodeKind::AiWorker { data } => self.ai.execute(&self.template, data, variables).await,
            _ => Ok(ActionOutput::default()),
        }
    }
}
