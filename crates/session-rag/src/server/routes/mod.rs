//! API routes for the RAG server

pub mod files;
pub mod ingest;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_body_size: usize) -> Router<AppState> {
    Router::new()
        // Indexing
        .route("/embed", post(ingest::embed_documents))
        // Answers, streamed as plain text
        .route("/query", post(query::query_session))
        .route("/chat", post(query::chat))
        .route("/ask", post(query::ask))
        // Uploaded files
        .route("/files/:filename", get(files::serve_file))
        // Info
        .route("/info", get(info))
        .layer(DefaultBodyLimit::max(max_body_size))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "session-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Session-scoped RAG backend: per-session document indexing and streamed answers",
        "endpoints": {
            "POST /api/embed": "Index a session's documents ({sessionId, docs})",
            "POST /api/query": "Streamed answer grounded in a session's documents ({sessionId, query})",
            "POST /api/chat": "Streamed answer without documents ({query})",
            "POST /api/ask": "Streamed answer, indexing first when the documents changed ({sessionId, query, docs})",
            "GET /api/files/:filename": "Download an uploaded file"
        }
    }))
}
