//! Document indexing endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{IndexRequest, IndexResponse};

/// POST /api/embed - Index a session's documents
pub async fn embed_documents(
    State(state): State<AppState>,
    Json(request): Json<IndexRequest>,
) -> Result<Json<IndexResponse>> {
    request.validate()?;
    let router = state.router()?;

    tracing::info!(
        "Embed request for session {} with {} document(s)",
        request.session_id,
        request.docs.len()
    );

    let report = router.index(&request.session_id, &request.docs).await?;
    Ok(Json(report.into()))
}
