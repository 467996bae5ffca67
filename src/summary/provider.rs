//! LLM provider abstraction for TL;DR generation.
//!
//! Defines the `LlmProvider` trait and common chat-completion types. The
//! summariser only needs one stateless operation: messages in, text out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from summariser providers. Never escape the summariser: a failed
/// TL;DR degrades to `None`.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned error: {0}")]
    ApiError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// Message role for chat-style prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Response from an LLM provider.
#[derive(Debug)]
pub struct ProviderResponse {
    /// The generated content.
    pub content: String,
    /// The model that produced it.
    pub model: String,
    /// Tokens used, if the provider reports them.
    pub tokens_used: Option<u32>,
}

/// Trait for chat-completion providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "openai").
    fn name(&self) -> &'static str;

    /// Model identifier in use.
    fn model(&self) -> &str;

    /// Send one chat completion request.
    async fn chat(&self, messages: &[Message]) -> Result<ProviderResponse, ProviderError>;
}
