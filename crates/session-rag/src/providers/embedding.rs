//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OpenAiEmbedder`: any OpenAI-compatible `/embeddings` endpoint
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for multiple texts, one vector per text in input
    /// order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate the embedding for a single query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::provider("no embedding returned for query"))
    }

    /// Embedding model identifier, persisted with every store
    fn model(&self) -> &str;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
