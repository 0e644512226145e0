//! Per-session vector stores

mod persist;
mod store;

pub use persist::{SessionStore, STORE_FILE};
pub use store::{SearchHit, StoreEntry, StoreHandle};
