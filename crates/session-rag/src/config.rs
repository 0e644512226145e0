//! Configuration for the session RAG backend

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variables that indicate a serverless runtime where only `/tmp`
/// is writable.
const SERVERLESS_MARKERS: &[&str] = &["VERCEL", "AWS_LAMBDA_FUNCTION_NAME", "NOW_REGION"];

/// Main RAG system configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// On-disk locations
    pub storage: StorageConfig,
    /// Embedding and completion backend
    pub llm: LlmConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Processing configuration
    pub processing: ProcessingConfig,
}

impl RagConfig {
    /// Load configuration: defaults, then an optional TOML file, then
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Some(key) = env_non_empty(&self.llm.api_key_env) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = env_non_empty("OPENAI_MODEL") {
            self.llm.chat_model = model;
        }
        if let Some(url) = env_non_empty("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(host) = env_non_empty("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_non_empty("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(root) = env_non_empty("SESSION_RAG_ROOT") {
            self.storage.root = Some(PathBuf::from(root));
        }
        if SERVERLESS_MARKERS.iter().any(|var| env_non_empty(var).is_some()) {
            self.storage.serverless = true;
        }
    }

    /// Reject settings the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be positive".to_string()));
        }
        if self.llm.embed_batch_size == 0 {
            return Err(Error::Config("llm.embed_batch_size must be positive".to_string()));
        }
        if self.processing.parallel_loads == 0 {
            return Err(Error::Config("processing.parallel_loads must be positive".to_string()));
        }
        Ok(())
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum JSON request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Where uploads and session stores live
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory; defaults to `/tmp` when serverless, else the working
    /// directory
    pub root: Option<PathBuf>,
    /// Running on a serverless platform
    pub serverless: bool,
}

/// Storage directories resolved once at startup and passed to every
/// component that touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    /// Base directory holding one sub-directory per session store
    pub data_dir: PathBuf,
    /// Managed upload directory local document references resolve into
    pub upload_dir: PathBuf,
}

impl StorageLocation {
    /// Resolve directories from configuration
    pub fn resolve(config: &StorageConfig) -> Result<Self> {
        let root = match &config.root {
            Some(root) => root.clone(),
            None if config.serverless => PathBuf::from("/tmp"),
            None => std::env::current_dir()?,
        };
        Ok(Self::under(root))
    }

    /// Standard layout below a root directory
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.join(".data").join("sessions"),
            upload_dir: root.join("uploads"),
        }
    }

    /// Create both directories
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.upload_dir)?;
        Ok(())
    }
}

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL (without trailing `/embeddings` or `/chat/completions`)
    pub base_url: String,
    /// API key; usually supplied through `api_key_env`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Embedding model name
    pub embed_model: String,
    /// Chat completion model name
    pub chat_model: String,
    /// Temperature for retrieval-augmented answers
    pub rag_temperature: f32,
    /// Temperature for plain chat
    pub chat_temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum texts per embedding request
    pub embed_batch_size: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            embed_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            rag_temperature: 0.2,
            chat_temperature: 0.7,
            timeout_secs: 120,
            embed_batch_size: 96,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1200,
            chunk_overlap: 150,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks retrieved per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Documents loaded concurrently during one index run
    pub parallel_loads: usize,
    /// Largest remote document accepted, in bytes (default: 50MB)
    pub max_document_bytes: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_loads: 4,
            max_document_bytes: 50 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size, 1200);
        assert_eq!(config.chunking.chunk_overlap, 150);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.llm.embed_model, "text-embedding-3-small");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = 1200;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session-rag.toml");
        std::fs::write(
            &path,
            "[chunking]\nchunk_size = 800\n\n[llm]\nchat_model = \"gpt-4o\"\n",
        )
        .unwrap();

        let config = RagConfig::from_file(&path).unwrap();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 150);
        assert_eq!(config.llm.chat_model, "gpt-4o");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_storage_location() {
        let location = StorageLocation::resolve(&StorageConfig {
            root: None,
            serverless: true,
        })
        .unwrap();
        assert_eq!(location.data_dir, PathBuf::from("/tmp/.data/sessions"));
        assert_eq!(location.upload_dir, PathBuf::from("/tmp/uploads"));

        let dir = tempfile::tempdir().unwrap();
        let location = StorageLocation::under(dir.path());
        location.ensure().unwrap();
        assert!(location.data_dir.is_dir());
        assert!(location.upload_dir.is_dir());
    }
}
