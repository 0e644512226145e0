//! Document ingestion: byte sources, format parsing and chunking

mod chunker;
mod loader;
mod parser;
pub mod source;

pub use chunker::TextChunker;
pub use loader::DocumentLoader;
pub use parser::FileParser;
pub use source::{MaterializedSource, SourceResolver};
