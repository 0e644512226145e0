//! Per-session index orchestration

use dashmap::DashMap;
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::ingestion::{DocumentLoader, TextChunker};
use crate::providers::EmbeddingProvider;
use crate::retrieval::{SessionStore, StoreHandle};
use crate::types::{DocumentReference, IndexReport, LoadedSegment};

use super::ledger::IndexLedger;

/// Builds and replaces session stores
///
/// Runs for the same session queue behind a per-session gate; different
/// sessions index concurrently.
pub struct IndexOrchestrator {
    loader: Arc<DocumentLoader>,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<SessionStore>,
    parallel_loads: usize,
    gates: DashMap<String, Arc<Mutex<()>>>,
    ledger: IndexLedger,
}

impl IndexOrchestrator {
    pub fn new(
        loader: Arc<DocumentLoader>,
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<SessionStore>,
        parallel_loads: usize,
    ) -> Self {
        Self {
            loader,
            chunker,
            embedder,
            store,
            parallel_loads: parallel_loads.max(1),
            gates: DashMap::new(),
            ledger: IndexLedger::default(),
        }
    }

    /// Document lists of the last successful run per session
    pub fn ledger(&self) -> &IndexLedger {
        &self.ledger
    }

    fn gate_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.gates
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Index the documents for a session, replacing any previous store
    ///
    /// All-or-nothing: a failure at any stage leaves the previous store in
    /// place.
    pub async fn index(&self, session_id: &str, docs: &[DocumentReference]) -> Result<IndexReport> {
        if session_id.trim().is_empty() {
            return Err(Error::InvalidRequest("Missing sessionId".to_string()));
        }
        if docs.is_empty() {
            return Err(Error::NoDocuments);
        }

        let gate = self.gate_for(session_id);
        let _guard = gate.lock().await;

        let start = Instant::now();
        tracing::info!("Indexing {} document(s) for session {}", docs.len(), session_id);

        let segments = self.load_all(docs).await?;
        let chunks = self.chunker.split(&segments)?;
        tracing::debug!(
            "Session {}: {} segment(s) split into {} chunk(s)",
            session_id,
            segments.len(),
            chunks.len()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        let handle = StoreHandle::build(chunks, vectors, self.embedder.model())?;
        self.store.save(&handle, session_id).await?;
        self.ledger.record(session_id, docs);

        let report = IndexReport {
            session_id: session_id.to_string(),
            documents: docs.len(),
            segments: segments.len(),
            chunks: handle.len(),
            dimensions: handle.dimensions(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Indexed session {}: {} chunks from {} document(s) in {}ms",
            session_id,
            report.chunks,
            report.documents,
            report.elapsed_ms
        );

        Ok(report)
    }

    /// Load every document with bounded concurrency, keeping input order
    async fn load_all(&self, docs: &[DocumentReference]) -> Result<Vec<LoadedSegment>> {
        // Built eagerly: a borrowing closure inside the stream is not Send
        let loads: Vec<_> = docs.iter().map(|doc| self.load_one(doc)).collect();
        let loaded: Vec<Vec<LoadedSegment>> = futures::stream::iter(loads)
            .buffered(self.parallel_loads)
            .try_collect()
            .await?;

        Ok(loaded.into_iter().flatten().collect())
    }

    async fn load_one(&self, doc: &DocumentReference) -> Result<Vec<LoadedSegment>> {
        self.loader.load(doc).await.map_err(|err| {
            tracing::error!("Failed to load {}: {}", doc.display_name(), err);
            match err {
                Error::LoadFailed { .. } => err,
                other => Error::load_failed(doc.display_name(), other.to_string()),
            }
        })
    }
}
