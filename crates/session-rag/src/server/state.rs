//! Application state for the RAG server

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{RagConfig, StorageLocation};
use crate::error::{Error, Result};
use crate::generation::{PlainResponder, RagResponder};
use crate::ingestion::{DocumentLoader, SourceResolver, TextChunker};
use crate::processing::IndexOrchestrator;
use crate::providers::{EmbeddingProvider, LlmProvider, OpenAiProvider};
use crate::retrieval::SessionStore;
use crate::routing::SessionRouter;

type Providers = (Arc<dyn EmbeddingProvider>, Arc<dyn LlmProvider>);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Upload and session directories
    location: StorageLocation,
    /// Document loader, also used to resolve uploaded files
    loader: Arc<DocumentLoader>,
    /// Session stores
    store: Arc<SessionStore>,
    /// Embedding and completion backends; absent without credentials
    providers: Option<Providers>,
    /// Indexing and answering; absent without provider credentials
    router: Option<Arc<SessionRouter>>,
    /// Why `router` is absent
    unconfigured: Option<String>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create application state with the OpenAI-compatible providers
    ///
    /// Missing credentials do not fail startup: the server comes up unready
    /// and every request that needs a provider is rejected.
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");

        let location = StorageLocation::resolve(&config.storage)?;
        location.ensure()?;
        tracing::info!(
            "Session stores in {}, uploads in {}",
            location.data_dir.display(),
            location.upload_dir.display()
        );

        match OpenAiProvider::new(&config.llm) {
            Ok(provider) => {
                tracing::info!("Using API at {}", config.llm.base_url);
                let (embedder, llm) = provider.split();
                Self::with_providers(config, location, Arc::new(embedder), Arc::new(llm))
            }
            Err(Error::ProviderUnconfigured(reason)) => {
                tracing::warn!("Providers unavailable, serving health endpoints only: {}", reason);
                Self::build(config, location, None, Some(reason))
            }
            Err(e) => Err(e),
        }
    }

    /// Create application state with explicit providers
    pub fn with_providers(
        config: RagConfig,
        location: StorageLocation,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        Self::build(config, location, Some((embedder, llm)), None)
    }

    fn build(
        config: RagConfig,
        location: StorageLocation,
        providers: Option<Providers>,
        unconfigured: Option<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        let loader = Arc::new(DocumentLoader::new(SourceResolver::new(
            &location,
            http,
            config.processing.max_document_bytes,
        )));
        let store = Arc::new(SessionStore::new(&location.data_dir));

        let router = match &providers {
            Some((embedder, llm)) => {
                tracing::info!(
                    "Embeddings via {} ({}), completions via {} ({})",
                    embedder.name(),
                    embedder.model(),
                    llm.name(),
                    llm.model()
                );
                let chunker =
                    TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
                let indexer = Arc::new(IndexOrchestrator::new(
                    Arc::clone(&loader),
                    chunker,
                    Arc::clone(embedder),
                    Arc::clone(&store),
                    config.processing.parallel_loads,
                ));
                let rag = Arc::new(RagResponder::new(
                    Arc::clone(&store),
                    Arc::clone(embedder),
                    Arc::clone(llm),
                    config.retrieval.top_k,
                    config.llm.rag_temperature,
                ));
                let plain = Arc::new(PlainResponder::new(Arc::clone(llm), config.llm.chat_temperature));
                Some(Arc::new(SessionRouter::new(indexer, rag, plain)))
            }
            None => None,
        };

        let ready = router.is_some();
        if ready {
            tracing::info!("RAG application state initialized");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                location,
                loader,
                store,
                providers,
                router,
                unconfigured,
                ready: RwLock::new(ready),
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get storage directories
    pub fn location(&self) -> &StorageLocation {
        &self.inner.location
    }

    /// Get document loader
    pub fn loader(&self) -> &DocumentLoader {
        &self.inner.loader
    }

    /// Get session stores
    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    /// Get the session router, or why it is unavailable
    pub fn router(&self) -> Result<&SessionRouter> {
        match &self.inner.router {
            Some(router) => Ok(router),
            None => Err(Error::ProviderUnconfigured(
                self.inner
                    .unconfigured
                    .clone()
                    .unwrap_or_else(|| "no provider configured".to_string()),
            )),
        }
    }

    /// Check if ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Whether both backends answer their health checks
    pub async fn providers_healthy(&self) -> bool {
        let Some((embedder, llm)) = &self.inner.providers else {
            return false;
        };
        let (embedder_ok, llm_ok) = tokio::join!(embedder.health_check(), llm.health_check());
        for (name, result) in [(embedder.name(), embedder_ok), (llm.name(), llm_ok)] {
            match result {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!("Provider {} is unhealthy", name);
                    return false;
                }
                Err(e) => {
                    tracing::warn!("Health check for {} failed: {}", name, e);
                    return false;
                }
            }
        }
        true
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
