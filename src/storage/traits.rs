//! Abstract storage traits for agrimatch.
//!
//! Two collections are persisted: knowledge entries and escalated queries.
//! Both are append-only, and each store is the single owner of its records.
//! Implementations must:
//! - serialize writers, so no two appends receive the same id
//! - make every append appear atomic to readers (no torn state)

use thiserror::Error;

use crate::entry::{KnowledgeEntry, NewEntry};
use crate::escalation::{EscalatedQuery, NewEscalation};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Persisted data failed an integrity check.
    #[error("Corrupted data: {0}")]
    Corrupted(String),

    /// Encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Another process holds the database lock.
    #[error("Database locked: {0}")]
    Locked(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Wraps an I/O error with the operation it interrupted.
    #[must_use]
    pub fn io(context: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::InvalidData => Self::Corrupted(format!("{context}: {err}")),
            std::io::ErrorKind::WouldBlock => Self::Locked(format!("{context}: {err}")),
            _ => Self::Io(format!("{context}: {err}")),
        }
    }
}

/// Storage trait for knowledge entries.
pub trait KnowledgeStore: Send + Sync {
    /// Returns every stored entry exactly once.
    fn list(&self) -> Result<Vec<KnowledgeEntry>, StorageError>;

    /// Stores `entry` under `max(existing ids) + 1` (or 1 when empty) and returns it.
    fn append(&self, entry: NewEntry) -> Result<KnowledgeEntry, StorageError>;

    /// Number of stored entries.
    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.list()?.len())
    }

    /// True if nothing is stored.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

/// Storage trait for the expert-review queue.
pub trait EscalationQueue: Send + Sync {
    /// Appends a query, stamping its id and timestamp.
    fn append(&self, query: NewEscalation) -> Result<EscalatedQuery, StorageError>;

    /// Returns all queries in append order.
    fn list(&self) -> Result<Vec<EscalatedQuery>, StorageError>;
}
