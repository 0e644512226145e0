//! Retrieval-augmented and plain responders

use futures::TryStreamExt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{CompletionRequest, EmbeddingProvider, LlmProvider, TokenStream};
use crate::retrieval::{SearchHit, SessionStore};

use super::prompt::PromptBuilder;

/// Context retrieved for one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    /// Chunk texts joined with a blank line; empty when nothing was retrieved
    pub text: String,
    /// Number of chunks in `text`
    pub hits: usize,
    /// Why retrieval fell back to an empty context, if it did
    pub degraded: Option<String>,
}

impl RetrievedContext {
    fn from_hits(hits: &[SearchHit]) -> Self {
        Self {
            text: PromptBuilder::build_context(hits),
            hits: hits.len(),
            degraded: None,
        }
    }

    fn degraded(reason: String) -> Self {
        Self {
            degraded: Some(reason),
            ..Self::default()
        }
    }
}

/// Concatenate a token stream into the full answer
pub async fn collect_tokens(tokens: TokenStream) -> Result<String> {
    tokens
        .try_fold(String::new(), |mut answer, token| async move {
            answer.push_str(&token);
            Ok(answer)
        })
        .await
}

/// Answers questions about a session's documents
pub struct RagResponder {
    store: Arc<SessionStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    top_k: usize,
    temperature: f32,
}

impl RagResponder {
    pub fn new(
        store: Arc<SessionStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        top_k: usize,
        temperature: f32,
    ) -> Self {
        Self {
            store,
            embedder,
            llm,
            top_k,
            temperature,
        }
    }

    /// Retrieve context for a query; never fails
    ///
    /// A missing or broken store, a failed query embedding and a failed
    /// search all yield an empty context.
    pub async fn retrieve(&self, session_id: &str, query: &str) -> RetrievedContext {
        match self.search(session_id, query).await {
            Ok(hits) => {
                tracing::debug!(
                    "Retrieved {} chunk(s) for session {}",
                    hits.len(),
                    session_id
                );
                RetrievedContext::from_hits(&hits)
            }
            Err(Error::StoreNotFound(_)) => {
                tracing::info!("No store for session {}, answering without context", session_id);
                RetrievedContext::degraded(format!("no store for session {}", session_id))
            }
            Err(err) if err.is_degradable() => {
                tracing::warn!(
                    "Store unusable for session {}, answering without context: {}",
                    session_id,
                    err
                );
                RetrievedContext::degraded(err.to_string())
            }
            // Query embedding failed; the completion may still succeed
            Err(err) => {
                tracing::error!(
                    "Retrieval failed for session {}, answering without context: {}",
                    session_id,
                    err
                );
                RetrievedContext::degraded(err.to_string())
            }
        }
    }

    async fn search(&self, session_id: &str, query: &str) -> Result<Vec<SearchHit>> {
        let handle = self.store.load(session_id).await?;
        let query_vector = self.embedder.embed_query(query).await?;
        handle.search(&query_vector, self.top_k)
    }

    fn request(&self, query: &str, context: &RetrievedContext) -> CompletionRequest {
        CompletionRequest::new(
            PromptBuilder::rag_messages(query, &context.text),
            self.temperature,
        )
    }

    /// Stream an answer grounded in the session's documents when possible
    pub async fn stream(&self, session_id: &str, query: &str) -> Result<TokenStream> {
        let context = self.retrieve(session_id, query).await;
        self.llm.complete_stream(&self.request(query, &context)).await
    }

    /// Full answer without streaming
    pub async fn answer(&self, session_id: &str, query: &str) -> Result<String> {
        let context = self.retrieve(session_id, query).await;
        self.llm.complete(&self.request(query, &context)).await
    }
}

/// Answers without any document context
pub struct PlainResponder {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
}

impl PlainResponder {
    pub fn new(llm: Arc<dyn LlmProvider>, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    fn request(&self, query: &str) -> CompletionRequest {
        CompletionRequest::new(PromptBuilder::chat_messages(query), self.temperature)
    }

    /// Stream a plain chat answer
    pub async fn stream(&self, query: &str) -> Result<TokenStream> {
        self.llm.complete_stream(&self.request(query)).await
    }

    /// Full plain chat answer
    pub async fn answer(&self, query: &str) -> Result<String> {
        self.llm.complete(&self.request(query)).await
    }
}
