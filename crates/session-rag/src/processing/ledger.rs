//! Which document list each session was last indexed with

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::types::DocumentReference;

/// Fingerprints of the document lists each session was last indexed with
///
/// Written only while the session's index gate is held, so a recorded
/// fingerprint always describes the store on disk.
#[derive(Default)]
pub struct IndexLedger {
    fingerprints: DashMap<String, String>,
}

impl IndexLedger {
    /// SHA-256 over the ordered `(url, name)` pairs
    pub fn fingerprint(docs: &[DocumentReference]) -> String {
        let mut hasher = Sha256::new();
        for doc in docs {
            hasher.update(doc.url.as_bytes());
            hasher.update([0u8]);
            hasher.update(doc.name.as_deref().unwrap_or_default().as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    /// Remember a successful index run
    pub(crate) fn record(&self, session_id: &str, docs: &[DocumentReference]) {
        self.fingerprints
            .insert(session_id.to_string(), Self::fingerprint(docs));
    }

    /// Whether the session was last indexed with exactly these documents
    pub fn is_fresh(&self, session_id: &str, docs: &[DocumentReference]) -> bool {
        self.fingerprints
            .get(session_id)
            .is_some_and(|recorded| *recorded == Self::fingerprint(docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_order_sensitive() {
        let a = DocumentReference::new("/api/files/a.txt", "a.txt");
        let b = DocumentReference::new("/api/files/b.txt", "b.txt");

        let ledger = IndexLedger::default();
        ledger.record("s1", &[a.clone(), b.clone()]);
        assert!(ledger.is_fresh("s1", &[a.clone(), b.clone()]));
        assert!(!ledger.is_fresh("s1", &[b.clone(), a.clone()]));
        assert!(!ledger.is_fresh("s1", &[a.clone()]));
        assert!(!ledger.is_fresh("s2", &[a, b]));
    }
}
