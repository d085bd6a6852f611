//! Storage for knowledge entries and escalated queries.
//!
//! The traits define the contract; `memory` provides a thread-safe in-memory
//! backend and `persistent` (feature `persistent`) a durable file-backed one.

pub mod memory;
pub mod seed;
mod traits;

#[cfg(feature = "persistent")]
pub mod persistent;

pub use memory::{InMemoryEscalationQueue, InMemoryKnowledgeStore};
pub use seed::sample_entries;
pub use traits::{EscalationQueue, KnowledgeStore, StorageError};

#[cfg(feature = "persistent")]
pub use persistent::{
    open_database, PersistentConfig, PersistentEscalationQueue, PersistentKnowledgeStore,
    PersistentStores,
};
