//! In-memory vector store for one session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Search result with chunk and similarity
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0..=1.0, higher is better)
    pub score: f32,
}

/// A chunk with its unit-length embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Chunks and embeddings for one session, searchable by cosine similarity
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHandle {
    /// Session the store was loaded for; `None` until persisted and reloaded
    session_id: Option<String>,
    model: String,
    dimensions: usize,
    created_at: DateTime<Utc>,
    entries: Vec<StoreEntry>,
}

impl StoreHandle {
    /// Build a store from chunks and their embeddings, paired by position
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>, model: impl Into<String>) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::EmptyStore);
        }
        if chunks.len() != vectors.len() {
            return Err(Error::internal(format!(
                "{} embeddings for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let dimensions = vectors[0].len();
        if dimensions == 0 || vectors.iter().any(|v| v.len() != dimensions) {
            return Err(Error::internal("embeddings have inconsistent dimensions"));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, mut vector)| {
                normalize(&mut vector);
                StoreEntry { chunk, vector }
            })
            .collect();

        Ok(Self {
            session_id: None,
            model: model.into(),
            dimensions,
            created_at: Utc::now(),
            entries,
        })
    }

    /// Reassemble a store from persisted parts; vectors are already unit length
    pub(crate) fn from_parts(
        session_id: &str,
        model: String,
        dimensions: usize,
        created_at: DateTime<Utc>,
        entries: Vec<StoreEntry>,
    ) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            model,
            dimensions,
            created_at,
            entries,
        }
    }

    /// Top `k` chunks by cosine similarity, best first; ties keep chunk order
    ///
    /// A query of another dimensionality means the store was built with a
    /// different model and is reported as corrupt.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimensions {
            return Err(Error::store_corrupt(
                self.session_id.as_deref().unwrap_or("unsaved"),
                format!(
                    "query has {} dimensions, store built by {} has {}",
                    query.len(),
                    self.model,
                    self.dimensions
                ),
            ));
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, dot(&query, &entry.vector)))
            .collect();
        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| SearchHit {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect())
    }

    /// Embedding model the vectors came from
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Vector dimensionality
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// When the store was built
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of chunks
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a built store
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[StoreEntry] {
        &self.entries
    }
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
