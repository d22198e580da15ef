//! Per-user document store.
//!
//! Holds the single most-recently-extracted document per authenticated
//! owner, in process memory. A new upload for the same owner replaces the
//! previous entry (last-write-wins, no versioning), and entries live until
//! overwritten or the process exits.
//!
//! Concurrency contract: `put` and `get` for different owners never
//! interfere; concurrent operations on the same key race last-write-wins,
//! which is acceptable under the one-document-per-owner invariant. The
//! whole map sits behind a single `RwLock` — per-key access is short and
//! lock-free alternatives are not warranted at this load.
//!
//! Known limitation: documents do not survive a restart and are not shared
//! across replicas. This type is the seam to swap for an external store if
//! the service ever runs multi-instance.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

/// The current document for one owner.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    /// Normalized extracted text.
    pub text: String,
    /// When extraction completed.
    pub extracted_at: DateTime<Utc>,
}

/// In-memory map from owner id to their current document.
pub struct DocumentStore {
    inner: RwLock<HashMap<String, StoredDocument>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Records `text` as the owner's current document, replacing any
    /// previous entry.
    pub fn put(&self, owner_id: &str, text: String) {
        let doc = StoredDocument {
            text,
            extracted_at: Utc::now(),
        };
        self.inner
            .write()
            .expect("document store lock poisoned")
            .insert(owner_id.to_string(), doc);
    }

    /// Returns a read-only copy of the owner's current document, if any.
    pub fn get(&self, owner_id: &str) -> Option<StoredDocument> {
        self.inner
            .read()
            .expect("document store lock poisoned")
            .get(owner_id)
            .cloned()
    }

    /// Removes the owner's entry. Returns true if one existed.
    pub fn clear(&self, owner_id: &str) -> bool {
        self.inner
            .write()
            .expect("document store lock poisoned")
            .remove(owner_id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("document store lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}
