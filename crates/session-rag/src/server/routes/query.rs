//! Streaming answer endpoints

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        HeaderName, HeaderValue,
    },
    response::Response,
    Json,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::convert::Infallible;

use crate::error::Result;
use crate::providers::TokenStream;
use crate::routing::RouteTaken;
use crate::server::state::AppState;
use crate::types::{AskRequest, ChatRequest, QueryRequest};

/// Header naming the route `POST /api/ask` took
pub const ROUTE_HEADER: HeaderName = HeaderName::from_static("x-rag-route");

/// Appended when the completion fails after streaming started
const INTERRUPTED_LINE: &str = "\n\n[Error] The response was interrupted. Please try again.";

/// POST /api/query - Answer from a session's documents
pub async fn query_session(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Response> {
    request.validate()?;
    let router = state.router()?;

    tracing::info!("Query for session {}: \"{}\"", request.session_id, request.query);

    let tokens = router.rag().stream(&request.session_id, &request.query).await?;
    Ok(stream_response(tokens, None))
}

/// POST /api/chat - Answer without documents
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response> {
    request.validate()?;
    let router = state.router()?;

    tracing::info!("Chat: \"{}\"", request.query);

    let tokens = router.plain().stream(&request.query).await?;
    Ok(stream_response(tokens, None))
}

/// POST /api/ask - Route between plain chat and RAG, indexing when needed
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Response> {
    request.validate()?;
    let router = state.router()?;

    tracing::info!(
        "Ask for session {} with {} document(s): \"{}\"",
        request.session_id,
        request.docs.len(),
        request.query
    );

    let answer = router
        .respond(&request.session_id, &request.docs, &request.query)
        .await?;
    Ok(stream_response(answer.tokens, Some(answer.route)))
}

/// Chunked `text/plain` response carrying the tokens as they arrive
fn stream_response(tokens: TokenStream, route: Option<RouteTaken>) -> Response {
    let mut response = Response::new(Body::from_stream(body_chunks(tokens)));
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Some(route) = route {
        headers.insert(ROUTE_HEADER, HeaderValue::from_static(route.as_str()));
    }
    response
}

/// Body chunks for a token stream; a failure ends the body with a generic
/// error line instead of aborting the connection
fn body_chunks(tokens: TokenStream) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> {
    futures::stream::unfold(Some(tokens), |state| async move {
        let mut tokens = state?;
        match tokens.next().await {
            Some(Ok(token)) => Some((Ok(Bytes::from(token)), Some(tokens))),
            Some(Err(err)) => {
                tracing::error!("Answer stream failed: {}", err);
                Some((Ok(Bytes::from_static(INTERRUPTED_LINE.as_bytes())), None))
            }
            None => None,
        }
    })
}
