//! Response bodies and reports

use serde::{Deserialize, Serialize};

/// Summary of a successful index run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    /// Session the store was written for
    pub session_id: String,
    /// Documents loaded
    pub documents: usize,
    /// Segments produced by the loader
    pub segments: usize,
    /// Chunks embedded and stored
    pub chunks: usize,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Wall time of the run
    pub elapsed_ms: u64,
}

/// Body returned by `POST /api/embed`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    /// Always true; failures use the error body
    pub ok: bool,
    /// What was indexed
    pub report: IndexReport,
}

impl From<IndexReport> for IndexResponse {
    fn from(report: IndexReport) -> Self {
        Self { ok: true, report }
    }
}
