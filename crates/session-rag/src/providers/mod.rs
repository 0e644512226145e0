//! Provider abstractions for embeddings and chat completions
//!
//! The pipeline only sees the traits; the OpenAI-compatible client is the
//! production backend.

pub mod embedding;
pub mod llm;
pub mod openai;

#[cfg(test)]
pub mod mock;

pub use embedding::EmbeddingProvider;
pub use llm::{ChatMessage, ChatRole, CompletionRequest, LlmProvider, TokenStream};
pub use openai::{OpenAiEmbedder, OpenAiLlm, OpenAiProvider};
