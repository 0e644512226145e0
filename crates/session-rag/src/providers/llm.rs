//! LLM provider trait for chat completions

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Incrementally delivered completion text
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Conversation so far, system prompt first
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>, temperature: f32) -> Self {
        Self {
            messages,
            temperature,
        }
    }
}

/// Trait for chat completion backends
///
/// Implementations:
/// - `OpenAiLlm`: any OpenAI-compatible `/chat/completions` endpoint
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate the full completion text
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Start a streamed completion
    ///
    /// Failures before the first token are returned here; failures after it
    /// arrive as an `Err` item and end the stream.
    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TokenStream>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
