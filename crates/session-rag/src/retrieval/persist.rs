//! On-disk session stores
//!
//! Each session owns `<data_dir>/session-<id>/store.bin`. Writes go to a temp
//! file in the same directory and are renamed over the previous blob, so a
//! reader sees either the old store or the new one.

use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{Error, Result};

use super::store::{StoreEntry, StoreHandle};

/// File name of the serialized store inside a session directory
pub const STORE_FILE: &str = "store.bin";

/// Leading bytes of every store blob
const MAGIC: &[u8; 4] = b"SRAG";

/// Bumped whenever `PersistedStore` changes shape
const FORMAT_VERSION: u32 = 1;

/// Largest blob the decoder accepts; also caps any length prefix inside it
const MAX_STORE_BYTES: usize = 1 << 30;

#[derive(Serialize, Deserialize)]
struct PersistedStore {
    format_version: u32,
    model: String,
    dimensions: u64,
    created_at_ms: i64,
    entries: Vec<StoreEntry>,
}

/// Persists and loads one vector store per session
pub struct SessionStore {
    data_dir: PathBuf,
    locks: DashMap<String, Arc<RwLock<()>>>,
}

impl SessionStore {
    /// Create a store rooted at the session data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            locks: DashMap::new(),
        }
    }

    /// Directory holding the given session's store
    pub fn directory_for(&self, session_id: &str) -> PathBuf {
        self.data_dir.join(directory_name(session_id))
    }

    /// Path of the given session's store blob
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.directory_for(session_id).join(STORE_FILE)
    }

    fn lock_for(&self, session_id: &str) -> Arc<RwLock<()>> {
        self.locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Replace the session's store
    pub async fn save(&self, handle: &StoreHandle, session_id: &str) -> Result<()> {
        let payload = encode(handle)?;
        let dir = self.directory_for(session_id);

        let lock = self.lock_for(session_id);
        let _guard = lock.write().await;

        let size = payload.len();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &payload)).await??;

        tracing::debug!(
            "Saved store for session {} ({} chunks, {} bytes)",
            session_id,
            handle.len(),
            size
        );
        Ok(())
    }

    /// Load the session's store
    pub async fn load(&self, session_id: &str) -> Result<StoreHandle> {
        let path = self.path_for(session_id);

        let lock = self.lock_for(session_id);
        let _guard = lock.read().await;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::StoreNotFound(session_id.to_string()));
            }
            Err(e) => return Err(Error::store_corrupt(session_id, e.to_string())),
        };

        let owner = session_id.to_string();
        let decoded = tokio::task::spawn_blocking(move || decode(&bytes, &owner))
            .await
            .map_err(|e| Error::store_corrupt(session_id, format!("decoder failed: {}", e)))?;
        decoded.map_err(|reason| Error::store_corrupt(session_id, reason))
    }

    /// Whether a store blob exists for the session
    pub async fn exists(&self, session_id: &str) -> bool {
        tokio::fs::try_exists(self.path_for(session_id))
            .await
            .unwrap_or(false)
    }
}

/// `session-<id>` for safe ids, `session-<sha256(id)>` otherwise
fn directory_name(session_id: &str) -> String {
    let safe = !session_id.is_empty()
        && session_id.len() <= 64
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if safe {
        format!("session-{}", session_id)
    } else {
        format!("session-{}", hex::encode(Sha256::digest(session_id.as_bytes())))
    }
}

fn encode(handle: &StoreHandle) -> Result<Vec<u8>> {
    let persisted = PersistedStore {
        format_version: FORMAT_VERSION,
        model: handle.model().to_string(),
        dimensions: handle.dimensions() as u64,
        created_at_ms: handle.created_at().timestamp_millis(),
        entries: handle.entries().to_vec(),
    };

    let mut bytes = MAGIC.to_vec();
    let body = bincode::serde::encode_to_vec(&persisted, bincode::config::standard())
        .map_err(|e| Error::internal(format!("Failed to encode store: {}", e)))?;
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

fn decode(bytes: &[u8], session_id: &str) -> std::result::Result<StoreHandle, String> {
    if bytes.len() > MAX_STORE_BYTES {
        return Err(format!("store is {} bytes, limit is {}", bytes.len(), MAX_STORE_BYTES));
    }
    let body = bytes
        .strip_prefix(MAGIC.as_slice())
        .ok_or_else(|| "missing store header".to_string())?;

    // Without a limit a forged length prefix makes the decoder allocate it
    let config = bincode::config::standard().with_limit::<MAX_STORE_BYTES>();
    let (persisted, _): (PersistedStore, usize) = bincode::serde::decode_from_slice(body, config)
        .map_err(|e| format!("undecodable store: {}", e))?;

    if persisted.format_version != FORMAT_VERSION {
        return Err(format!(
            "format version {} (expected {})",
            persisted.format_version, FORMAT_VERSION
        ));
    }

    let dimensions = persisted.dimensions as usize;
    if persisted.entries.is_empty() {
        return Err("store has no entries".to_string());
    }
    if let Some(entry) = persisted.entries.iter().find(|e| e.vector.len() != dimensions) {
        return Err(format!(
            "chunk {} has {} dimensions, store records {}",
            entry.chunk.source.chunk_index,
            entry.vector.len(),
            dimensions
        ));
    }

    let created_at: DateTime<Utc> = Utc
        .timestamp_millis_opt(persisted.created_at_ms)
        .single()
        .ok_or_else(|| "invalid creation timestamp".to_string())?;

    Ok(StoreHandle::from_parts(
        session_id,
        persisted.model,
        dimensions,
        created_at,
        persisted.entries,
    ))
}

fn write_atomically(dir: &Path, payload: &[u8]) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".store-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(payload)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(STORE_FILE)).map_err(|e| Error::Io(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, ChunkSource};

    fn handle(texts: &[&str]) -> StoreHandle {
        let chunks = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                text: text.to_string(),
                source: ChunkSource {
                    source_name: "notes.txt".to_string(),
                    page: if i == 0 { None } else { Some(i as u32) },
                    char_start: 0,
                    char_end: text.chars().count(),
                    chunk_index: i as u32,
                },
            })
            .collect();
        let vectors = (0..texts.len()).map(|i| vec![1.0, i as f32, 0.5]).collect();
        StoreHandle::build(chunks, vectors, "text-embedding-3-small").unwrap()
    }

    #[test]
    fn test_directory_names() {
        assert_eq!(directory_name("s1"), "session-s1");
        assert_eq!(directory_name("user_42-chat"), "session-user_42-chat");

        let hashed = directory_name("../../etc");
        assert!(hashed.starts_with("session-"));
        assert_eq!(hashed.len(), "session-".len() + 64);
        assert!(!hashed.contains('.'));

        assert_ne!(directory_name(&"a".repeat(65)), format!("session-{}", "a".repeat(65)));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let original = handle(&["The capital of France is Paris.", "Second chunk"]);

        assert!(!store.exists("s1").await);
        store.save(&original, "s1").await.unwrap();
        assert!(store.exists("s1").await);
        assert!(dir.path().join("session-s1").join(STORE_FILE).is_file());

        let loaded = store.load("s1").await.unwrap();
        assert_eq!(loaded.model(), "text-embedding-3-small");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.entries(), original.entries());
        assert_eq!(
            loaded.created_at().timestamp_millis(),
            original.created_at().timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_save_replaces_previous_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        store.save(&handle(&["old one", "old two", "old three"]), "s1").await.unwrap();
        store.save(&handle(&["new"]), "s1").await.unwrap();

        let loaded = store.load("s1").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.entries()[0].chunk.text, "new");

        let leftovers: Vec<_> = std::fs::read_dir(store.directory_for("s1"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from(STORE_FILE)]);
    }

    #[tokio::test]
    async fn test_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(matches!(store.load("never").await, Err(Error::StoreNotFound(_))));
    }

    #[tokio::test]
    async fn test_corrupt_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store.save(&handle(&["text"]), "s1").await.unwrap();

        std::fs::write(store.path_for("s1"), b"garbage").unwrap();
        assert!(matches!(
            store.load("s1").await,
            Err(Error::StoreCorrupt { .. })
        ));

        let mut truncated = encode(&handle(&["some longer text here"])).unwrap();
        truncated.truncate(truncated.len() / 2);
        std::fs::write(store.path_for("s1"), truncated).unwrap();
        assert!(matches!(
            store.load("s1").await,
            Err(Error::StoreCorrupt { .. })
        ));
    }

    #[test]
    fn test_version_mismatch_is_corrupt() {
        let persisted = PersistedStore {
            format_version: FORMAT_VERSION + 1,
            model: "m".to_string(),
            dimensions: 3,
            created_at_ms: 0,
            entries: handle(&["x"]).entries().to_vec(),
        };
        let mut bytes = MAGIC.to_vec();
        bytes.extend(bincode::serde::encode_to_vec(&persisted, bincode::config::standard()).unwrap());

        let err = decode(&bytes, "s1").unwrap_err();
        assert!(err.contains("format version"));
    }

    #[tokio::test]
    async fn test_forged_length_prefix_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        std::fs::create_dir_all(store.directory_for("s1")).unwrap();

        // version 1, then a model name claiming u64::MAX bytes
        let mut bytes = MAGIC.to_vec();
        bytes.push(1);
        bytes.push(0xFD);
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        std::fs::write(store.path_for("s1"), bytes).unwrap();

        assert!(matches!(
            store.load("s1").await,
            Err(Error::StoreCorrupt { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_load_during_save_sees_whole_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SessionStore::new(dir.path()));
        store.save(&handle(&["one"]), "s1").await.unwrap();

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for round in 0..20 {
                    let texts: &[&str] = if round % 2 == 0 { &["a", "b", "c"] } else { &["one"] };
                    store.save(&handle(texts), "s1").await.unwrap();
                }
            })
        };
        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..50 {
                    let loaded = store.load("s1").await.unwrap();
                    assert!(loaded.len() == 1 || loaded.len() == 3);
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
    }
}
