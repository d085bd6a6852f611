//! The knowledge desk: one handle over stores, matcher, confidence gate and curation.
//!
//! Request handlers hold a [`KnowledgeDesk`] (it is `Send + Sync`) and call it
//! concurrently. Reads never block each other; curated writes serialize in the
//! [`CurationGate`] and are visible to every search that starts after `curate`
//! returns.

use std::sync::Arc;

use tracing::debug;

use crate::confidence::{ConfidencePercent, ConfidencePolicy, Verdict};
use crate::config::DeskConfig;
use crate::curation::{CurationGate, SecretProvider, Submission};
use crate::entry::KnowledgeEntry;
use crate::error::{AgriError, AgriResult};
use crate::escalation::{EscalatedQuery, NewEscalation};
use crate::matching::{MatchEngine, MatchResult};
use crate::storage::{EscalationQueue, InMemoryEscalationQueue, InMemoryKnowledgeStore, KnowledgeStore};

/// Result of asking the desk a question.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// The question as asked.
    pub query: String,
    /// Whether the best candidate can be presented outright.
    pub verdict: Verdict,
    /// Every candidate under the match threshold, best first.
    pub candidates: Vec<MatchResult>,
}

impl Answer {
    /// The top candidate, if any.
    #[must_use]
    pub const fn best(&self) -> Option<&MatchResult> {
        self.verdict.best()
    }

    /// Confidence of the top candidate.
    #[must_use]
    pub fn confidence(&self) -> Option<ConfidencePercent> {
        self.verdict.confidence()
    }

    /// True if the caller should offer to escalate the question.
    #[must_use]
    pub const fn should_offer_escalation(&self) -> bool {
        self.verdict.should_offer_escalation()
    }
}

/// Farmer-question service facade.
pub struct KnowledgeDesk {
    knowledge: Arc<dyn KnowledgeStore>,
    escalations: Arc<dyn EscalationQueue>,
    engine: Arc<MatchEngine>,
    policy: ConfidencePolicy,
    gate: CurationGate,
}

impl KnowledgeDesk {
    /// Creates a desk over existing stores. The index is built on first use.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `config` is invalid.
    pub fn new(
        knowledge: Arc<dyn KnowledgeStore>,
        escalations: Arc<dyn EscalationQueue>,
        secrets: Arc<dyn SecretProvider>,
        config: DeskConfig,
    ) -> AgriResult<Self> {
        let config = config.validate()?;
        let engine = Arc::new(MatchEngine::new(config.matching)?);
        let gate = CurationGate::new(secrets, Arc::clone(&knowledge), Arc::clone(&engine));

        Ok(Self {
            knowledge,
            escalations,
            engine,
            policy: config.confidence,
            gate,
        })
    }

    /// A desk backed by in-memory stores holding `entries`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `config` is invalid.
    pub fn in_memory(
        entries: Vec<KnowledgeEntry>,
        secrets: Arc<dyn SecretProvider>,
        config: DeskConfig,
    ) -> AgriResult<Self> {
        Self::new(
            Arc::new(InMemoryKnowledgeStore::with_entries(entries)),
            Arc::new(InMemoryEscalationQueue::new()),
            secrets,
            config,
        )
    }

    /// A desk over the database in `dir`, created if missing.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid `config`, or the storage error
    /// from opening the database.
    #[cfg(feature = "persistent")]
    pub fn open(
        dir: impl AsRef<std::path::Path>,
        secrets: Arc<dyn SecretProvider>,
        config: DeskConfig,
    ) -> AgriResult<Self> {
        let config = config.validate()?;
        let stores = crate::storage::open_database(dir, Some(config.persistent))?;
        Self::new(
            Arc::new(stores.knowledge),
            Arc::new(stores.escalations),
            secrets,
            config,
        )
    }

    /// Ranks the knowledge base against `query` and judges the best candidate.
    ///
    /// # Errors
    ///
    /// `IndexUnavailable` if the index has never been built and the store
    /// cannot be read to build it.
    pub fn ask(&self, query: &str) -> AgriResult<Answer> {
        let candidates = self.search(query)?;
        let verdict = self.policy.assess(&candidates);
        debug!(
            candidates = candidates.len(),
            confident = verdict.is_confident(),
            "question assessed"
        );
        Ok(Answer {
            query: query.to_string(),
            verdict,
            candidates,
        })
    }

    /// Ranked candidates for `query`, best first.
    ///
    /// # Errors
    ///
    /// Same as [`ask`](Self::ask).
    pub fn search(&self, query: &str) -> AgriResult<Vec<MatchResult>> {
        self.ensure_index()?;
        self.engine.search(query)
    }

    /// Every stored entry.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the store cannot be read.
    pub fn entries(&self) -> AgriResult<Vec<KnowledgeEntry>> {
        Ok(self.knowledge.list()?)
    }

    /// Queues `question` for expert review, whatever the match outcome was.
    ///
    /// # Errors
    ///
    /// A validation error for a blank question, or the storage error from the queue.
    pub fn escalate(&self, question: &str, metadata: Option<&str>) -> AgriResult<EscalatedQuery> {
        let query = NewEscalation::new(question, metadata)?;
        Ok(self.escalations.append(query)?)
    }

    /// Every escalated query, in the order they were queued.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the queue cannot be read.
    pub fn escalations(&self) -> AgriResult<Vec<EscalatedQuery>> {
        Ok(self.escalations.list()?)
    }

    /// Adds a knowledge entry through the curation gate.
    ///
    /// # Errors
    ///
    /// See [`CurationGate::submit`].
    pub fn curate(&self, secret: &str, submission: Submission) -> AgriResult<KnowledgeEntry> {
        self.gate.submit(secret, submission)
    }

    /// Rebuilds the index from the store, clearing a stale flag.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the store cannot be read.
    pub fn rebuild_index(&self) -> AgriResult<usize> {
        self.gate.refresh()
    }

    /// True if an entry was stored that the index does not yet reflect.
    #[must_use]
    pub fn is_index_stale(&self) -> bool {
        self.engine.is_stale()
    }

    /// The confidence gate in use.
    #[must_use]
    pub const fn policy(&self) -> &ConfidencePolicy {
        &self.policy
    }

    /// The matcher, for callers that need raw search access.
    #[must_use]
    pub const fn engine(&self) -> &Arc<MatchEngine> {
        &self.engine
    }

    fn ensure_index(&self) -> AgriResult<()> {
        if self.engine.is_built() {
            return Ok(());
        }
        self.gate
            .refresh()
            .map(|_| ())
            .map_err(|e| AgriError::index_unavailable(format!("initial index load failed: {e}")))
    }
}
