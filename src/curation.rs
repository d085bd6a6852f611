//! Curated writes to the knowledge store.
//!
//! [`CurationGate`] is the only writer of knowledge entries. A submission is
//! authorized against the configured curation secret, validated, appended, and
//! the match index is rebuilt before `submit` returns, so no search that starts
//! after a successful submission can miss the new entry.

use std::env;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::entry::{KnowledgeEntry, NewEntry};
use crate::error::{AgriError, AgriResult, AuthorizationError};
use crate::matching::MatchEngine;
use crate::storage::{KnowledgeStore, StorageError};

/// Environment variable read by [`EnvSecret`].
pub const CURATION_SECRET_VAR: &str = "AGRIMATCH_CURATION_SECRET";

/// The expected curation secret. Its value never appears in `Debug` output.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    /// Wraps `value`, or returns `None` if it is empty.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        (!value.is_empty()).then_some(Self(value))
    }

    /// Compares `candidate` against the secret.
    ///
    /// Both sides are hashed first; `blake3::Hash` equality runs in constant time.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        blake3::hash(self.0.as_bytes()) == blake3::hash(candidate.as_bytes())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Source of the expected curation secret.
///
/// Called on every submission, so a provider may rotate the value at any time.
pub trait SecretProvider: Send + Sync {
    /// The current secret, or `None` when curation is not configured.
    fn curation_secret(&self) -> Option<Secret>;
}

/// A secret fixed at construction.
#[derive(Debug, Clone)]
pub struct StaticSecret(Option<Secret>);

impl StaticSecret {
    /// Uses `value` as the secret. An empty value disables curation.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(Secret::new(value))
    }

    /// A provider with no secret; every submission is denied.
    #[must_use]
    pub const fn disabled() -> Self {
        Self(None)
    }
}

impl SecretProvider for StaticSecret {
    fn curation_secret(&self) -> Option<Secret> {
        self.0.clone()
    }
}

/// Reads the secret from an environment variable at every check.
#[derive(Debug, Clone)]
pub struct EnvSecret {
    var: String,
}

impl EnvSecret {
    /// Reads [`CURATION_SECRET_VAR`].
    #[must_use]
    pub fn new() -> Self {
        Self::from_var(CURATION_SECRET_VAR)
    }

    /// Reads the named variable instead.
    #[must_use]
    pub fn from_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvSecret {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretProvider for EnvSecret {
    fn curation_secret(&self) -> Option<Secret> {
        env::var(&self.var).ok().and_then(Secret::new)
    }
}

/// A proposed knowledge entry, before authorization and validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    /// Question text; must not be blank.
    pub question: String,
    /// Answer text; must not be blank.
    pub answer: String,
    /// Crop the entry applies to; `"All"` when absent or blank.
    pub crop: Option<String>,
    /// Free-text labels.
    pub tags: Option<String>,
}

impl Submission {
    /// A submission with no crop or tags.
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            crop: None,
            tags: None,
        }
    }

    /// Sets the crop.
    #[must_use]
    pub fn with_crop(mut self, crop: impl Into<String>) -> Self {
        self.crop = Some(crop.into());
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }
}

/// Authorizes, stores and indexes new knowledge entries.
pub struct CurationGate {
    secrets: Arc<dyn SecretProvider>,
    knowledge: Arc<dyn KnowledgeStore>,
    engine: Arc<MatchEngine>,
    // Held across append + rebuild so an older listing never replaces a newer index.
    rebuild: Mutex<()>,
}

impl CurationGate {
    /// Creates a gate writing to `knowledge` and rebuilding `engine`.
    pub fn new(
        secrets: Arc<dyn SecretProvider>,
        knowledge: Arc<dyn KnowledgeStore>,
        engine: Arc<MatchEngine>,
    ) -> Self {
        Self {
            secrets,
            knowledge,
            engine,
            rebuild: Mutex::new(()),
        }
    }

    /// Checks `secret` against the provider.
    ///
    /// # Errors
    ///
    /// `SecretUnavailable` if no secret is configured, `InvalidSecret` on any mismatch.
    pub fn authorize(&self, secret: &str) -> Result<(), AuthorizationError> {
        let expected = self
            .secrets
            .curation_secret()
            .ok_or(AuthorizationError::SecretUnavailable)?;
        if expected.matches(secret) {
            Ok(())
        } else {
            Err(AuthorizationError::InvalidSecret)
        }
    }

    /// Adds an entry and rebuilds the match index before returning it.
    ///
    /// # Errors
    ///
    /// - `Authorization` if the secret is rejected; nothing is written
    /// - `Validation` if the question or answer is blank, or a field is too long
    /// - `Storage` if the append fails; nothing is written
    /// - `IndexStale` if the entry was stored but the index could not be rebuilt.
    ///   The engine is flagged stale and the next successful rebuild clears it.
    pub fn submit(&self, secret: &str, submission: Submission) -> AgriResult<KnowledgeEntry> {
        if let Err(denied) = self.authorize(secret) {
            warn!(reason = %denied, "curation submission denied");
            return Err(denied.into());
        }

        let entry = NewEntry::new(
            &submission.question,
            &submission.answer,
            submission.crop.as_deref(),
            submission.tags.as_deref(),
        )?;

        let _rebuild = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = self.knowledge.append(entry)?;

        if let Err(source) = self.rebuild_from_store() {
            self.engine.mark_stale();
            warn!(entry_id = %stored.id, error = %source, "match index marked stale");
            return Err(AgriError::IndexStale {
                entry_id: stored.id,
                source,
            });
        }

        Ok(stored)
    }

    /// Rebuilds the index from the current store contents.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the store cannot be listed; the previous
    /// index, if any, stays in place.
    pub fn refresh(&self) -> AgriResult<usize> {
        let _rebuild = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.rebuild_from_store()?)
    }

    fn rebuild_from_store(&self) -> Result<usize, StorageError> {
        let entries = self.knowledge.list()?;
        Ok(self.engine.build(entries))
    }
}
