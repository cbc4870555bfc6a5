//! Executor backed by an OpenAI-compatible chat completions API.

use super::{Executor, ExecutorFactory};
use crate::errors::ExecutorError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings shared by every OpenAI-backed stage.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiConfig {
    /// Bearer token.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// API base URL without a trailing slash.
    pub base_url: String,
}

impl OpenAiConfig {
    /// Creates a config against the default base URL.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the base URL (for proxies and mock servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Builds executors that share one HTTP client and one config.
#[derive(Debug, Clone)]
pub struct OpenAiExecutorFactory {
    http: Client,
    config: Arc<OpenAiConfig>,
}

impl OpenAiExecutorFactory {
    /// Creates a factory with a fresh HTTP client.
    #[must_use]
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            http: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Creates an executor that sends `instructions` as the system message.
    #[must_use]
    pub fn executor(&self, instructions: impl Into<String>) -> OpenAiExecutor {
        OpenAiExecutor {
            http: self.http.clone(),
            config: Arc::clone(&self.config),
            instructions: instructions.into(),
        }
    }
}

impl ExecutorFactory for OpenAiExecutorFactory {
    fn create(&self, _stage: &str, instructions: &str) -> Arc<dyn Executor> {
        Arc::new(self.executor(instructions))
    }
}

/// Sends the stage input as the user message and returns the first choice.
#[derive(Debug, Clone)]
pub struct OpenAiExecutor {
    http: Client,
    config: Arc<OpenAiConfig>,
    instructions: String,
}

impl OpenAiExecutor {
    /// Creates an executor with its own HTTP client.
    #[must_use]
    pub fn new(config: OpenAiConfig, instructions: impl Into<String>) -> Self {
        OpenAiExecutorFactory::new(config).executor(instructions)
    }

    /// Returns the system instructions.
    #[must_use]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    fn request<'a>(&'a self, context: &'a str) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if !self.instructions.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &self.instructions,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: context,
        });

        ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages,
        }
    }
}

#[async_trait]
impl Executor for OpenAiExecutor {
    async fn invoke(&self, context: &str, timeout: Duration) -> Result<String, ExecutorError> {
        let response = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .timeout(timeout)
            .json(&self.request(context))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExecutorError::Timeout(timeout)
                } else {
                    ExecutorError::failure(format!("HTTP error: {e}"))
                }
            })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(ExecutorError::failure(format!(
                "API error (status {status}): {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExecutorError::failure(format!("invalid response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ExecutorError::failure("response contained no message content"))
    }
}
