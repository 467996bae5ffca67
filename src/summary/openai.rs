//! OpenAI-compatible chat-completion provider.
//!
//! Works against OpenAI itself and any service implementing the same Chat
//! Completions API through a custom `base_url`.

use super::provider::{LlmProvider, Message, ProviderError, ProviderResponse, Role};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// OpenAI chat request format.
#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    max_tokens: u32,
}

/// OpenAI message format.
#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

impl From<&Message> for OpenAiMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role: role.to_string(),
            content: msg.content.clone(),
        }
    }
}

/// OpenAI chat response format.
#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    model: String,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    total_tokens: u32,
}

/// Configuration for the OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key.
    pub api_key: String,
    /// Model name (e.g. "gpt-4o").
    pub model: String,
    /// Base URL (e.g. "https://api.openai.com/v1").
    pub base_url: String,
    /// Sampling temperature; summaries want a low one.
    pub temperature: f32,
    /// Output cap per completion.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.3,
            max_tokens: 300,
            timeout_secs: 120,
        }
    }
}

/// OpenAI-compatible [`LlmProvider`].
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    /// Create a new provider with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_empty() {
            return Err(ProviderError::AuthError("API key is required".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| ProviderError::ConfigError(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn chat(&self, messages: &[Message]) -> Result<ProviderResponse, ProviderError> {
        let request = OpenAiChatRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(|m| m.into()).collect(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        // A single attempt, no retries: a failed summary degrades to no
        // TL;DR upstream, so every failure funnels into one error path.
        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status,
                String::from_utf8_lossy(&body)
            )));
        }

        let parsed: OpenAiChatResponse = serde_json::from_slice(&body)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        debug!("Chat completion from model {}", parsed.model);

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("empty choices array".to_string()))?;

        Ok(ProviderResponse {
            content: choice.message.content.trim().to_string(),
            model: parsed.model,
            tokens_used: parsed.usage.map(|u| u.total_tokens),
        })
    }
}
