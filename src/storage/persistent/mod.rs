//! Persistent storage backend for agrimatch.
//!
//! A database is a directory holding:
//! - `.lock`: exclusive advisory lock, one process per directory
//! - `knowledge.snap`: the knowledge collection, replaced atomically on every append
//! - `escalations.log`: append-only journal of escalated queries
//!
//! Every record carries a CRC32 so corruption is detected on open rather than
//! served to callers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     PersistentStores                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐  ┌────────────────────────┐        │
//! │  │ PersistentKnowledge  │  │ PersistentEscalation   │        │
//! │  │ (snapshot + rename)  │  │ (append journal)       │        │
//! │  └──────────┬───────────┘  └───────────┬────────────┘        │
//! │             └──────────────┬───────────┘                     │
//! │                            ↓                                 │
//! │                 ┌─────────────────────┐                      │
//! │                 │  DirLock (flock)    │                      │
//! │                 └─────────────────────┘                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod codec;
mod file_lock;
mod journal;
mod snapshot;
mod stores;

pub use file_lock::{DirLock, LOCK_FILE};
pub use stores::{
    PersistentEscalationQueue, PersistentKnowledgeStore, PersistentStores, ESCALATION_FILE,
    KNOWLEDGE_FILE,
};

use std::path::Path;

use crate::storage::traits::StorageError;

/// Configuration for persistent storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistentConfig {
    /// Whether to fsync after every write (slower but safer).
    pub sync_on_write: bool,
    /// Create a fresh knowledge store with the sample entries.
    pub seed_sample: bool,
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            seed_sample: true,
        }
    }
}

/// Open or create a persistent agrimatch database at the given path.
///
/// # Arguments
/// * `path` - Directory to store the database files
/// * `config` - Optional configuration (uses defaults if None)
///
/// # Errors
/// - `Io` if the path cannot be created or accessed
/// - `Locked` if another process holds the lock
/// - `Corrupted` if a file fails its integrity check
///
/// # Example
/// ```rust,ignore
/// use agrimatch::storage::persistent::open_database;
///
/// let stores = open_database("./faq.agri", None)?;
/// let desk = KnowledgeDesk::new(
///     Arc::new(stores.knowledge),
///     Arc::new(stores.escalations),
///     secrets,
///     DeskConfig::default(),
/// )?;
/// ```
pub fn open_database(
    path: impl AsRef<Path>,
    config: Option<PersistentConfig>,
) -> Result<PersistentStores, StorageError> {
    PersistentStores::open(path.as_ref(), config.unwrap_or_default())
}
