// ABOUTME: Outbound webhook action: rendered HTTP call to a configured endpoint
// ABOUTME: Any HTTP status >= 400 fails the attempt and is left to the retry policy

use reqwest::redirect::Policy;
use reqwest::Method;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{ActionError, ActionOutput, Result};
use crate::definition::{Variables, WebhookActionConfig};
use crate::template::TemplateEngine;

const RESPONSE_BODY_LIMIT: usize = 1000;

/// Render the configured body and headers against the workflow variables
/// and issue the request. One invocation is one attempt.
pub async fn execute(
    template: &TemplateEngine,
    config: &WebhookActionConfig,
    variables: &Variables,
) -> Result<ActionOutput> {
    let method = Method::from_bytes(config.method.to_uppercase().as_bytes())
        .map_err(|_| ActionError::InvalidMethod(config.method.clone()))?;

    let body = template.render(&config.body_template, variables)?;

    let redirect = if config.follow_redirects {
        Policy::limited(10)
    } else {
        Policy::none()
    };
    let client = reqwest::Client::builder()
        .redirect(redirect)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?;

    let mut request = client.request(method, &config.url);
    for (name, value) in &config.headers {
        request = request.header(name.as_str(), template.render(value, variables)?);
    }
    if !body.is_empty() {
        request = request.body(body);
    }

    debug!(url = %config.url, method = %config.method, "dispatching webhook action");

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if status.as_u16() >= 400 {
        return Err(ActionError::HttpStatus {
            status: status.as_u16(),
            body: truncate(&text),
        });
    }

    Ok(ActionOutput {
        details: json!({
            "response_status": status.as_u16(),
            "response_body": truncate(&text),
        }),
        variables: Variables::new(),
    })
}

fn truncate(text: &str) -> String {
    if text.len() <= RESPONSE_BODY_LIMIT {
        text.to_string()
    } else {
        let mut end = RESPONSE_BODY_LIMIT;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text[..end].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(url: &str) -> WebhookActionConfig {
        serde_json::from_value(json!({"url": url})).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_method_is_rejected_before_sending() {
        let template = TemplateEngine::new();
        let mut cfg = config("http://localhost:9/hook");
        cfg.method = "NOT A METHOD".to_string();

        let result = execute(&template, &cfg, &Variables::new()).await;

        assert!(matches!(result, Err(ActionError::InvalidMethod(_))));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "é".repeat(RESPONSE_BODY_LIMIT);
        let truncated = truncate(&long);
        assert!(truncated.len() <= RESPONSE_BODY_LIMIT);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
