//! Persistent store implementations.
//!
//! Each store keeps the full collection in memory for reads and writes through
//! to disk before the in-memory view changes, so a failed write leaves no trace
//! and readers never observe a record that is not durable.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::entry::{next_entry_id, KnowledgeEntry, NewEntry};
use crate::escalation::{EscalatedQuery, EscalationId, NewEscalation};
use crate::storage::seed::sample_entries;
use crate::storage::traits::{EscalationQueue, KnowledgeStore, StorageError};

use super::file_lock::DirLock;
use super::journal::Journal;
use super::snapshot::{self, SnapshotWriter};
use super::PersistentConfig;

/// Snapshot file holding the knowledge collection.
pub const KNOWLEDGE_FILE: &str = "knowledge.snap";

/// Journal file holding the escalation queue.
pub const ESCALATION_FILE: &str = "escalations.log";

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

fn check_unique_ids(entries: &[KnowledgeEntry]) -> Result<(), StorageError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.id) {
            return Err(StorageError::Corrupted(format!(
                "knowledge snapshot contains duplicate id {}",
                entry.id
            )));
        }
    }
    Ok(())
}

/// Knowledge store backed by an atomically replaced snapshot file.
pub struct PersistentKnowledgeStore {
    path: PathBuf,
    entries: RwLock<Arc<Vec<KnowledgeEntry>>>,
    writer: Mutex<()>,
    sync_on_write: bool,
    dir_sync: fn(&Path) -> std::io::Result<()>,
    _lock: Arc<DirLock>,
}

impl PersistentKnowledgeStore {
    /// Loads the snapshot at `path`, creating it from `seed` if it does not exist.
    pub(crate) fn open(
        path: &Path,
        seed: Vec<KnowledgeEntry>,
        sync_on_write: bool,
        lock: Arc<DirLock>,
    ) -> Result<Self, StorageError> {
        let entries: Vec<KnowledgeEntry> = if path.exists() {
            snapshot::read(path).map_err(|e| StorageError::io("read knowledge snapshot", &e))?
        } else {
            snapshot::write(path, &seed, sync_on_write)
                .map_err(|e| StorageError::io("create knowledge snapshot", &e))?;
            seed
        };
        check_unique_ids(&entries)?;

        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(Arc::new(entries)),
            writer: Mutex::new(()),
            sync_on_write,
            dir_sync: snapshot::sync_parent_dir,
            _lock: lock,
        })
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn current(&self) -> Result<Arc<Vec<KnowledgeEntry>>, StorageError> {
        let guard = self.entries.read().map_err(|_| lock_err("knowledge.read"))?;
        Ok(Arc::clone(&guard))
    }
}

impl KnowledgeStore for PersistentKnowledgeStore {
    fn list(&self) -> Result<Vec<KnowledgeEntry>, StorageError> {
        Ok(self.current()?.as_ref().clone())
    }

    fn append(&self, entry: NewEntry) -> Result<KnowledgeEntry, StorageError> {
        let _writer = self.writer.lock().map_err(|_| lock_err("knowledge.append"))?;

        let current = self.current()?;
        let stored = entry.into_entry(next_entry_id(&current));

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(stored.clone());

        SnapshotWriter::create(&self.path)
            .and_then(|writer| writer.commit(&next, self.sync_on_write))
            .map_err(|e| StorageError::io("write knowledge snapshot", &e))?;

        // The rename has replaced the file, so the id is taken from here on.
        *self.entries.write().map_err(|_| lock_err("knowledge.publish"))? = Arc::new(next);

        if self.sync_on_write {
            if let Err(e) = (self.dir_sync)(&self.path) {
                warn!(id = %stored.id, error = %e, "knowledge snapshot directory sync failed");
            }
        }

        info!(id = %stored.id, crop = %stored.crop, "knowledge entry appended");
        Ok(stored)
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.current()?.len())
    }
}

/// Escalation queue backed by an append-only journal.
pub struct PersistentEscalationQueue {
    journal: Mutex<Journal>,
    queries: RwLock<Vec<EscalatedQuery>>,
    _lock: Arc<DirLock>,
}

impl PersistentEscalationQueue {
    /// Replays the journal at `path`, creating it if missing.
    pub(crate) fn open(
        path: &Path,
        sync_on_write: bool,
        lock: Arc<DirLock>,
    ) -> Result<Self, StorageError> {
        let (journal, queries) = Journal::open::<EscalatedQuery>(path, sync_on_write)
            .map_err(|e| StorageError::io("open escalation journal", &e))?;

        Ok(Self {
            journal: Mutex::new(journal),
            queries: RwLock::new(queries),
            _lock: lock,
        })
    }
}

impl EscalationQueue for PersistentEscalationQueue {
    fn append(&self, query: NewEscalation) -> Result<EscalatedQuery, StorageError> {
        let mut journal = self.journal.lock().map_err(|_| lock_err("escalation.append"))?;

        let previous = self
            .queries
            .read()
            .map_err(|_| lock_err("escalation.last"))?
            .last()
            .map(|q| q.id);
        let now = Utc::now();
        let stored = query.into_query(EscalationId::allocate(previous, now), now);

        journal
            .append(&stored)
            .map_err(|e| StorageError::io("append escalation", &e))?;

        self.queries
            .write()
            .map_err(|_| lock_err("escalation.publish"))?
            .push(stored.clone());

        info!(id = %stored.id, "question escalated for expert review");
        Ok(stored)
    }

    fn list(&self) -> Result<Vec<EscalatedQuery>, StorageError> {
        let queries = self.queries.read().map_err(|_| lock_err("escalation.list"))?;
        Ok(queries.clone())
    }
}

/// Both stores of one database directory, sharing its lock.
pub struct PersistentStores {
    /// Knowledge entries.
    pub knowledge: PersistentKnowledgeStore,
    /// Expert-review queue.
    pub escalations: PersistentEscalationQueue,
    /// Directory lock; released once every store opened from it is dropped.
    pub lock: Arc<DirLock>,
}

impl PersistentStores {
    /// Opens or creates the database in `dir`.
    pub fn open(dir: &Path, config: PersistentConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(dir)
            .map_err(|e| StorageError::io("create database directory", &e))?;

        let lock = Arc::new(
            DirLock::acquire(dir).map_err(|e| StorageError::io("acquire database lock", &e))?,
        );

        let removed = snapshot::remove_stale_temp_files(dir)
            .map_err(|e| StorageError::io("clean temp files", &e))?;

        let seed = if config.seed_sample {
            sample_entries()
        } else {
            Vec::new()
        };
        let knowledge = PersistentKnowledgeStore::open(
            &dir.join(KNOWLEDGE_FILE),
            seed,
            config.sync_on_write,
            Arc::clone(&lock),
        )?;
        let escalations = PersistentEscalationQueue::open(
            &dir.join(ESCALATION_FILE),
            config.sync_on_write,
            Arc::clone(&lock),
        )?;

        debug!(
            dir = %dir.display(),
            entries = knowledge.len()?,
            escalations = escalations.list()?.len(),
            stale_temp_files = removed,
            "database opened"
        );

        Ok(Self {
            knowledge,
            escalations,
            lock,
        })
    }
}
