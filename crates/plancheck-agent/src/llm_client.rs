//! Client for OpenAI-compatible chat completions.
//!
//! Works against OpenAI itself or any local server exposing
//! `/v1/chat/completions` (vLLM, llama.cpp server, ...). Responses are
//! requested in JSON mode; callers parse the returned content.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Chat completions client.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

/// A chat message with role and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Request body for /v1/chat/completions.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    response_format: ResponseFormat,
}

/// Response from /v1/chat/completions.
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    /// Create a client.
    ///
    /// # Arguments
    /// * `base_url` - Server root (e.g., "https://api.openai.com" or "http://localhost:8000")
    /// * `api_key` - Bearer token, if the server wants one
    /// * `model` - Model name sent with every request
    /// * `timeout` - Per-request HTTP timeout
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one JSON-mode completion at temperature 0 and return the raw content.
    ///
    /// An empty or missing content field comes back as `"{}"`.
    pub async fn complete_json(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context("Failed to send chat completion request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat completion failed with status {}: {}", status, body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .context("No choices in chat completion response")?;

        Ok(choice
            .message
            .content
            .filter(|content| !content.trim().is_empty())
            .unwrap_or_else(|| "{}".to_string()))
    }

    /// Check whether the server is reachable.
    ///
    /// Tries `/health` (local servers) and then `/v1/models` (hosted APIs).
    pub async fn health_check(&self) -> Result<bool> {
        for path in ["/health", "/v1/models"] {
            let url = format!("{}{}", self.base_url, path);
            let mut builder = self.client.get(&url);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }
            if let Ok(response) = builder.send().await {
                if response.status().is_success() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
