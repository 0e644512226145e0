//! Uploaded file serving

use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// GET /api/files/:filename - Serve a file from the upload directory
pub async fn serve_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response> {
    let resolved = state
        .loader()
        .resolver()
        .resolve_local(&filename, &filename)
        .await;

    let path = match resolved {
        Ok(path) if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) => path,
        Ok(_) | Err(Error::SourceUnavailable { .. }) => return Ok(not_found(&filename)),
        Err(e) => return Err(e),
    };

    let data = tokio::fs::read(&path).await?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    tracing::debug!("Serving {} ({}, {} bytes)", filename, mime, data.len());
    Ok(([(CONTENT_TYPE, mime.to_string())], data).into_response())
}

fn not_found(filename: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "message": format!("File not found: {}", filename),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::providers::mock::{HashEmbedder, ScriptedLlm};
    use crate::server::routes::testing::body_string;
    use crate::server::{build_router, state::testing::state_with};

    async fn get(app: axum::Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_serves_uploaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(
            dir.path(),
            Arc::new(HashEmbedder::new(64)),
            Arc::new(ScriptedLlm::echo()),
        );
        std::fs::write(state.location().upload_dir.join("notes.txt"), "hello").unwrap();

        let response = get(build_router(state), "/api/files/notes.txt").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(body_string(response).await, "hello");
    }

    #[tokio::test]
    async fn test_missing_and_escaping_files() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(
            dir.path(),
            Arc::new(HashEmbedder::new(64)),
            Arc::new(ScriptedLlm::echo()),
        );
        std::fs::write(dir.path().join("secret.txt"), "secret").unwrap();
        let app = build_router(state);

        let response = get(app.clone(), "/api/files/missing.txt").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get(app, "/api/files/..%2Fsecret.txt").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
