//! OpenAI-compatible backend.
//!
//! Works with any endpoint exposing `/chat/completions` in the OpenAI
//! shape (OpenAI, OpenRouter, Ollama, vLLM, ...). The backend renders a
//! prompt, sends it as a single user message, and digs the first JSON
//! object out of the reply.

use async_trait::async_trait;
use devloop_core::backend::{ActionRequest, Backend, BackgroundProcess};
use devloop_core::error::BackendError;
use devloop_core::event::Conversation;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::prompt;

pub struct OpenAiCompatBackend {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| BackendError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Convenience constructor for api.openai.com.
    pub fn openai(api_key: impl Into<String>) -> Result<Self, BackendError> {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Send one user message and return the reply text.
    async fn complete(&self, model: &str, prompt: String) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
        });

        debug!(backend = %self.name, model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(BackendError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(BackendError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend returned error");
            return Err(BackendError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| BackendError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl Backend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn request_action(
        &self,
        instruction: &str,
        conversation: Conversation<'_>,
        model: &str,
        background_processes: &[BackgroundProcess],
    ) -> Result<Option<ActionRequest>, BackendError> {
        let prompt = prompt::action_prompt(instruction, conversation, background_processes);
        let reply = self.complete(model, prompt).await?;
        Ok(parse_action_reply(&reply))
    }

    async fn summarize(
        &self,
        conversation: Conversation<'_>,
        model: &str,
    ) -> Result<Vec<ActionRequest>, BackendError> {
        let prompt = prompt::summary_prompt(conversation);
        let reply = self.complete(model, prompt).await?;
        parse_summary_reply(&reply)
    }
}

/// The first JSON object in `text`, skipping any prose or code fences
/// around it.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(value @ Value::Object(_))) = values.next() {
            return Some(value);
        }
        search_from = start + 1;
    }
    None
}

/// Decode an action reply. Anything that is not an `{action, args}` object
/// yields `None`.
pub fn parse_action_reply(text: &str) -> Option<ActionRequest> {
    let Some(value) = extract_json_object(text) else {
        warn!(reply_len = text.len(), "Backend reply contained no JSON object");
        return None;
    };
    match serde_json::from_value(value) {
        Ok(request) => Some(request),
        Err(e) => {
            warn!(error = %e, "Backend reply is not an action");
            None
        }
    }
}

/// Decode a summary reply: an object whose `new_monologue` is an array of
/// `{action, args}` entries.
pub fn parse_summary_reply(text: &str) -> Result<Vec<ActionRequest>, BackendError> {
    let invalid = |message: String| BackendError::ApiError {
        status_code: 200,
        message,
    };
    let value = extract_json_object(text)
        .ok_or_else(|| invalid("Summary reply contained no JSON object".into()))?;
    let summary: SummaryReply = serde_json::from_value(value)
        .map_err(|e| invalid(format!("Summary reply has the wrong shape: {e}")))?;
    Ok(summary.new_monologue)
}

// --- OpenAI API types ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryReply {
    new_monologue: Vec<ActionRequest>,
}
