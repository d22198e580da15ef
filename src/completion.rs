//! Completion gateway — the single choke point for all AI-backed routes.
//!
//! Sends single-turn chat-completion requests to the configured external
//! service and returns trimmed completion text. Transport and service
//! failures are normalized into [`ApiError`]; reqwest error shapes never
//! leak to callers.
//!
//! Request body: `{ model, messages: [{ role: "user", content }], temperature }`.
//! Response shape consumed: `{ choices: [{ message: { content } }] }` —
//! anything else fails loudly as an upstream error.
//!
//! No retries happen here. A failed call is surfaced once; resubmission is
//! the caller's decision.

use std::time::Duration;

use serde::Serialize;

use crate::config::CompletionConfig;
use crate::error::ApiError;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

/// HTTP client for the external completion service.
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl CompletionClient {
    /// Builds a client from configuration. The API key is read once from
    /// the environment variable named in `config.api_key_env` and is never
    /// logged or echoed in errors.
    pub fn new(config: &CompletionConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// Sends `prompt` as a single user message and returns the first
    /// completion's text, trimmed.
    pub async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, ApiError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let response = self
            .http
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout("completion request".to_string())
                } else {
                    // e.to_string() carries no header values, so the key stays out.
                    ApiError::upstream_transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ApiError::upstream(status.as_u16(), &body_text));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiError::upstream_transport(format!("invalid JSON response: {}", e)))?;

        parse_completion_text(&json)
    }
}

/// Extracts `choices[0].message.content` from a completion response and
/// trims surrounding whitespace. Any shape mismatch is an upstream error.
pub fn parse_completion_text(json: &serde_json::Value) -> Result<String, ApiError> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            ApiError::upstream_transport("malformed completion response: missing choices[0].message.content")
        })?;
    Ok(content.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_and_trims_first_choice() {
        let json = json!({
            "choices": [
                { "message": { "content": "  the answer \n" } },
                { "message": { "content": "ignored" } }
            ]
        });
        assert_eq!(parse_completion_text(&json).unwrap(), "the answer");
    }

    #[test]
    fn empty_choices_is_upstream_error() {
        let json = json!({ "choices": [] });
        let err = parse_completion_text(&json).unwrap_err();
        assert!(matches!(err, ApiError::Upstream { status: None, .. }));
    }

    #[test]
    fn missing_content_is_upstream_error() {
        let json = json!({ "choices": [{ "message": {} }] });
        assert!(parse_completion_text(&json).is_err());
    }

    #[test]
    fn non_object_response_is_upstream_error() {
        let json = json!("oops");
        assert!(parse_completion_text(&json).is_err());
    }

    #[test]
    fn request_body_serializes_to_expected_shape() {
        let body = CompletionRequest {
            model: "openai/gpt-3.5-turbo",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            temperature: 0.7,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "openai/gpt-3.5-turbo");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hello");
        assert!((value["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }
}
