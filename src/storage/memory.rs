//! In-memory storage backend.
//!
//! Thread-safe implementations of the storage traits, intended for embedded
//! usage, tests, and as a reference implementation.

use std::sync::RwLock;

use chrono::Utc;
use tracing::info;

use crate::entry::{next_entry_id, KnowledgeEntry, NewEntry};
use crate::escalation::{EscalatedQuery, EscalationId, NewEscalation};
use crate::storage::traits::{EscalationQueue, KnowledgeStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// In-memory knowledge store.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeStore {
    entries: RwLock<Vec<KnowledgeEntry>>,
}

impl InMemoryKnowledgeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries` (e.g. the sample set).
    #[must_use]
    pub fn with_entries(entries: Vec<KnowledgeEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl KnowledgeStore for InMemoryKnowledgeStore {
    fn list(&self) -> Result<Vec<KnowledgeEntry>, StorageError> {
        let entries = self.entries.read().map_err(|_| lock_err("knowledge.list"))?;
        Ok(entries.clone())
    }

    fn append(&self, entry: NewEntry) -> Result<KnowledgeEntry, StorageError> {
        let mut entries = self.entries.write().map_err(|_| lock_err("knowledge.append"))?;

        let stored = entry.into_entry(next_entry_id(&entries));
        entries.push(stored.clone());

        info!(id = %stored.id, crop = %stored.crop, "knowledge entry appended");
        Ok(stored)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let entries = self.entries.read().map_err(|_| lock_err("knowledge.len"))?;
        Ok(entries.len())
    }
}

/// In-memory escalation queue.
#[derive(Debug, Default)]
pub struct InMemoryEscalationQueue {
    queries: RwLock<Vec<EscalatedQuery>>,
}

impl InMemoryEscalationQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EscalationQueue for InMemoryEscalationQueue {
    fn append(&self, query: NewEscalation) -> Result<EscalatedQuery, StorageError> {
        let mut queries = self.queries.write().map_err(|_| lock_err("escalation.append"))?;

        let now = Utc::now();
        let id = EscalationId::allocate(queries.last().map(|q| q.id), now);
        let stored = query.into_query(id, now);
        queries.push(stored.clone());

        info!(id = %stored.id, "question escalated for expert review");
        Ok(stored)
    }

    fn list(&self) -> Result<Vec<EscalatedQuery>, StorageError> {
        let queries = self.queries.read().map_err(|_| lock_err("escalation.list"))?;
        Ok(queries.clone())
    }
}
