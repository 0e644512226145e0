//! Index runs: load, chunk, embed and persist a session's documents

mod indexer;
mod ledger;

pub use indexer::IndexOrchestrator;
pub use ledger::IndexLedger;
