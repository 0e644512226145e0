//! session-rag: Session-scoped RAG backend
//!
//! Each conversation (session) gets its own vector store built from the
//! documents uploaded to it. Questions are answered with retrieved context
//! when a store exists and plainly otherwise, streamed token by token over
//! HTTP.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod routing;
pub mod server;
pub mod types;

pub use config::{RagConfig, StorageLocation};
pub use error::{Error, ErrorKind, Result};
pub use routing::{Route, RouteTaken, RoutingPolicy, SessionRouter};
pub use types::{
    document::{Chunk, ChunkSource, DocumentReference, FileType, LoadedSegment},
    query::{AskRequest, ChatRequest, IndexRequest, QueryRequest},
    response::{IndexReport, IndexResponse},
};
