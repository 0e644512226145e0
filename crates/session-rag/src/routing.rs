//! Choosing between plain chat and retrieval-augmented answers

use std::sync::Arc;

use crate::error::Result;
use crate::generation::{PlainResponder, RagResponder};
use crate::processing::IndexOrchestrator;
use crate::providers::TokenStream;
use crate::types::{DocumentReference, IndexReport};

/// What to do with a question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// No documents: answer without retrieval
    Plain,
    /// Documents with a fresh index: retrieve, then answer
    Rag,
    /// Documents without a fresh index: index first, then retrieve
    IndexThenRag,
}

/// Stateless routing decision
pub struct RoutingPolicy;

impl RoutingPolicy {
    pub fn decide(has_documents: bool, fresh_index: bool) -> Route {
        match (has_documents, fresh_index) {
            (false, _) => Route::Plain,
            (true, true) => Route::Rag,
            (true, false) => Route::IndexThenRag,
        }
    }
}

/// Route actually taken for a request, reported in the `x-rag-route` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTaken {
    Plain,
    Rag,
    IndexedRag,
    /// Indexing failed, so the question was answered without documents
    PlainFallback,
}

impl RouteTaken {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Rag => "rag",
            Self::IndexedRag => "indexed-rag",
            Self::PlainFallback => "plain-fallback",
        }
    }
}

/// A routed answer
pub struct RoutedAnswer {
    pub route: RouteTaken,
    pub tokens: TokenStream,
}

/// Front door for indexing and answering
pub struct SessionRouter {
    indexer: Arc<IndexOrchestrator>,
    rag: Arc<RagResponder>,
    plain: Arc<PlainResponder>,
}

impl SessionRouter {
    pub fn new(
        indexer: Arc<IndexOrchestrator>,
        rag: Arc<RagResponder>,
        plain: Arc<PlainResponder>,
    ) -> Self {
        Self {
            indexer,
            rag,
            plain,
        }
    }

    /// Retrieval-augmented responder
    pub fn rag(&self) -> &RagResponder {
        &self.rag
    }

    /// Plain responder
    pub fn plain(&self) -> &PlainResponder {
        &self.plain
    }

    /// Index a session's documents; the orchestrator remembers the list
    pub async fn index(&self, session_id: &str, docs: &[DocumentReference]) -> Result<IndexReport> {
        self.indexer.index(session_id, docs).await
    }

    /// Answer a question, indexing first when the document list changed
    pub async fn respond(
        &self,
        session_id: &str,
        docs: &[DocumentReference],
        query: &str,
    ) -> Result<RoutedAnswer> {
        let fresh = self.indexer.ledger().is_fresh(session_id, docs);
        let route = match RoutingPolicy::decide(!docs.is_empty(), fresh) {
            Route::Plain => RouteTaken::Plain,
            Route::Rag => RouteTaken::Rag,
            Route::IndexThenRag => match self.index(session_id, docs).await {
                Ok(_) => RouteTaken::IndexedRag,
                Err(err) => {
                    tracing::warn!(
                        "Indexing failed for session {}, answering without documents: {}",
                        session_id,
                        err
                    );
                    RouteTaken::PlainFallback
                }
            },
        };

        tracing::debug!("Session {} routed to {}", session_id, route.as_str());

        let tokens = match route {
            RouteTaken::Plain | RouteTaken::PlainFallback => self.plain.stream(query).await?,
            RouteTaken::Rag | RouteTaken::IndexedRag => self.rag.stream(session_id, query).await?,
        };

        Ok(RoutedAnswer { route, tokens })
    }
}
