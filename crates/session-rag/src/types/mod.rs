//! Core types for the RAG system

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkSource, DocumentReference, FileType, LoadedSegment};
pub use query::{AskRequest, ChatRequest, IndexRequest, QueryRequest};
pub use response::{IndexReport, IndexResponse};
