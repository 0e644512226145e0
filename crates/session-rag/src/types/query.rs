//! Request bodies accepted by the HTTP surface
//!
//! Fields default to empty so that a missing field is reported as an input
//! error by [`validate`](IndexRequest::validate) instead of a JSON rejection.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::DocumentReference;

/// Body of `POST /api/embed`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexRequest {
    /// Conversation identifier
    pub session_id: String,
    /// Documents to index
    pub docs: Vec<DocumentReference>,
}

impl IndexRequest {
    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        require("sessionId", &self.session_id)?;
        if self.docs.is_empty() {
            return Err(Error::NoDocuments);
        }
        Ok(())
    }
}

/// Body of `POST /api/query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryRequest {
    /// Conversation identifier
    pub session_id: String,
    /// User question
    pub query: String,
}

impl QueryRequest {
    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        require("sessionId", &self.session_id)?;
        require("query", &self.query)
    }
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    /// User message
    pub query: String,
}

impl ChatRequest {
    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        require("query", &self.query)
    }
}

/// Body of `POST /api/ask`: the caller's view of the session, routed
/// server-side
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AskRequest {
    /// Conversation identifier
    pub session_id: String,
    /// User question
    pub query: String,
    /// Every document uploaded to the session so far, in upload order
    pub docs: Vec<DocumentReference>,
}

impl AskRequest {
    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        require("sessionId", &self.session_id)?;
        require("query", &self.query)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidRequest(format!("Missing {}", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_session_is_invalid() {
        let request: IndexRequest =
            serde_json::from_str(r#"{"docs":[{"url":"/api/files/a.txt"}]}"#).unwrap();
        assert!(matches!(request.validate(), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_empty_docs_is_no_documents() {
        let request: IndexRequest =
            serde_json::from_str(r#"{"sessionId":"s1","docs":[]}"#).unwrap();
        assert!(matches!(request.validate(), Err(Error::NoDocuments)));
    }

    #[test]
    fn test_query_requires_both_fields() {
        let request: QueryRequest = serde_json::from_str(r#"{"query":"hi"}"#).unwrap();
        assert!(request.validate().is_err());

        let request: QueryRequest =
            serde_json::from_str(r#"{"sessionId":"s1","query":"hi"}"#).unwrap();
        assert!(request.validate().is_ok());
    }
}
