// ABOUTME: Generative-text action: one chat-completion call per attempt
// ABOUTME: Renders prompts from variables and proposes the output-variable update

use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{ActionError, ActionOutput, Result};
use crate::config::AiConfig;
use crate::definition::{AiWorkerConfig, Variables};
use crate::template::TemplateEngine;

#[derive(Debug, Clone)]
pub struct AiClient {
    endpoint: String,
    api_key: Option<String>,
    default_model: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            default_model: config.model.clone(),
            http,
        })
    }

    /// Render the prompts, make a single completion call, and on success
    /// propose `{output_variable: response_text}` for the caller to merge.
    pub async fn execute(
        &self,
        template: &TemplateEngine,
        config: &AiWorkerConfig,
        variables: &Variables,
    ) -> Result<ActionOutput> {
        let system_prompt = template.render(&config.system_prompt, variables)?;
        let user_prompt = template.render(&config.user_prompt, variables)?;
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let payload = json!({
            "model": model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        });

        debug!(%model, endpoint = %self.endpoint, "dispatching generative call");

        let mut request = self.http.post(&self.endpoint).json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ActionError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .first()
            .ok_or(ActionError::EmptyCompletion)?
            .message
            .content
            .trim()
            .to_string();

        let mut updates = Variables::new();
        updates.insert(config.output_variable.clone(), Value::String(text));

        Ok(ActionOutput {
            details: json!({"model": model}),
            variables: updates,
        })
    }
}
