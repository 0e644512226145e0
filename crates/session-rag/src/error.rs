//! Error types for the session RAG backend
//!
//! Every failure carries an [`ErrorKind`] so callers can decide between
//! degrading (missing or broken session store) and aborting (bad credentials,
//! bad input) without looking at message text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classification used for propagation decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing credentials or invalid configuration; fatal
    Configuration,
    /// Empty or malformed request; never retried
    Input,
    /// A document could not be fetched or parsed
    Source,
    /// Embedding or completion backend failure; caller may retry
    Provider,
    /// Session store missing, corrupt or empty; soft at query time
    Store,
    /// Anything else
    Internal,
}

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No credential for the embedding/completion backend
    #[error("Provider is not configured: {0}")]
    ProviderUnconfigured(String),

    /// Malformed request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Index request without any document
    #[error("No documents provided for indexing")]
    NoDocuments,

    /// Local reference escaping the managed upload directory
    #[error("Path escapes the upload directory: {0}")]
    PathTraversal(String),

    /// Extension outside the supported set
    #[error("Unsupported file type '{extension}' for '{name}'")]
    UnsupportedFormat { name: String, extension: String },

    /// Byte source could not be opened
    #[error("Document source unavailable for '{name}': {reason}")]
    SourceUnavailable { name: String, reason: String },

    /// Document bytes could not be turned into text
    #[error("Failed to load document '{name}': {reason}")]
    LoadFailed { name: String, reason: String },

    /// Nothing but whitespace after loading every document
    #[error("No text could be extracted from the provided documents")]
    EmptyInput,

    /// Embedding backend failure
    #[error("Embedding provider error: {0}")]
    Provider(String),

    /// Completion backend failure
    #[error("Completion error: {0}")]
    Completion(String),

    /// Attempt to build a store from zero chunks
    #[error("Cannot build a vector store without chunks")]
    EmptyStore,

    /// No persisted store for the session
    #[error("Vector store for session '{0}' not found")]
    StoreNotFound(String),

    /// Persisted store exists but cannot be used
    #[error("Vector store for session '{session_id}' is corrupt: {reason}")]
    StoreCorrupt { session_id: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a load failure for a named document
    pub fn load_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a source-unavailable error for a named document
    pub fn source_unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a store-corrupt error
    pub fn store_corrupt(session_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreCorrupt {
            session_id: session_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an embedding provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    /// Create a completion error
    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::ProviderUnconfigured(_) => ErrorKind::Configuration,
            Error::InvalidRequest(_)
            | Error::NoDocuments
            | Error::PathTraversal(_)
            | Error::UnsupportedFormat { .. }
            | Error::EmptyInput
            | Error::Json(_) => ErrorKind::Input,
            Error::SourceUnavailable { .. } | Error::LoadFailed { .. } => ErrorKind::Source,
            Error::Provider(_) | Error::Completion(_) | Error::Http(_) => ErrorKind::Provider,
            Error::EmptyStore | Error::StoreNotFound(_) | Error::StoreCorrupt { .. } => {
                ErrorKind::Store
            }
            Error::Io(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True when query-time retrieval may swallow this error and continue
    /// with an empty context.
    pub fn is_degradable(&self) -> bool {
        self.kind() == ErrorKind::Store
    }

    /// Name of the offending document, when the error is about one
    pub fn document_name(&self) -> Option<&str> {
        match self {
            Error::UnsupportedFormat { name, .. }
            | Error::SourceUnavailable { name, .. }
            | Error::LoadFailed { name, .. } => Some(name),
            _ => None,
        }
    }

    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::ProviderUnconfigured(_) => (StatusCode::BAD_REQUEST, "provider_unconfigured"),
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Error::NoDocuments => (StatusCode::BAD_REQUEST, "no_documents"),
            Error::PathTraversal(_) => (StatusCode::FORBIDDEN, "forbidden"),
            Error::UnsupportedFormat { .. } => (StatusCode::BAD_REQUEST, "unsupported_type"),
            Error::EmptyInput => (StatusCode::UNPROCESSABLE_ENTITY, "empty_input"),
            Error::SourceUnavailable { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "source_unavailable"),
            Error::LoadFailed { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "load_failed"),
            Error::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            Error::Completion(_) => (StatusCode::BAD_GATEWAY, "completion_error"),
            Error::EmptyStore => (StatusCode::UNPROCESSABLE_ENTITY, "empty_store"),
            Error::StoreNotFound(_) => (StatusCode::NOT_FOUND, "store_not_found"),
            Error::StoreCorrupt { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "store_corrupt"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("Task join error: {}", err))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", error_type, self);
        } else {
            tracing::warn!("Request rejected ({}): {}", error_type, self);
        }

        let body = Json(json!({
            "error": error_type,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_degradable() {
        assert!(Error::StoreNotFound("s1".into()).is_degradable());
        assert!(Error::store_corrupt("s1", "bad header").is_degradable());
        assert!(!Error::ProviderUnconfigured("OPENAI_API_KEY".into()).is_degradable());
        assert!(!Error::completion("quota").is_degradable());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Error::NoDocuments.kind(), ErrorKind::Input);
        assert_eq!(Error::load_failed("a.pdf", "boom").kind(), ErrorKind::Source);
        assert_eq!(Error::provider("429").kind(), ErrorKind::Provider);
        assert_eq!(Error::Config("x".into()).kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::NoDocuments.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::PathTraversal("../etc/passwd".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::load_failed("a.pdf", "boom").into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_document_name() {
        let err = Error::source_unavailable("notes.txt", "404");
        assert_eq!(err.document_name(), Some("notes.txt"));
        assert_eq!(Error::EmptyInput.document_name(), None);
    }
}
