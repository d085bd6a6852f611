//! # agrimatch - Farmer question retrieval and escalation
//!
//! agrimatch answers farmers' free-text questions from a curated knowledge
//! base. Questions are fuzzily matched against every entry, the best match is
//! judged by a confidence gate, and anything the knowledge base cannot answer
//! confidently can be escalated to a human expert queue.
//!
//! ## Core Concepts
//!
//! - **KnowledgeEntry**: an append-only question/answer pair with crop and tag metadata
//! - **MatchEngine**: typo-tolerant multi-field search over a rebuildable index
//! - **ConfidencePolicy**: turns the best match score into a percentage and a [`Verdict`]
//! - **EscalationQueue**: durable queue of questions awaiting expert review
//! - **CurationGate**: the secret-guarded, only writer of new knowledge
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agrimatch::{DeskConfig, EnvSecret, KnowledgeDesk, Submission};
//!
//! let desk = KnowledgeDesk::open("./faq.agri", Arc::new(EnvSecret::new()), DeskConfig::from_env()?)?;
//!
//! let answer = desk.ask("how much water for wheat")?;
//! if answer.should_offer_escalation() {
//!     desk.escalate(&answer.query, Some("district: Thrissur"))?;
//! }
//!
//! desk.curate(&secret, Submission::new("How to control late blight?", "Copper fungicide.").with_crop("Potato"))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Records
pub mod entry;
pub mod error;
pub mod escalation;

// Storage and retrieval
pub mod confidence;
pub mod matching;
pub mod storage;

// Service surface
pub mod advice;
pub mod config;
pub mod curation;
pub mod desk;

// Re-export primary types at crate root for convenience
pub use advice::{resolve_with_fallback, Advice, AdviceGenerator, AdviceRequest, Resolution};
pub use confidence::{ConfidencePercent, ConfidencePolicy, Verdict};
pub use config::DeskConfig;
pub use curation::{CurationGate, EnvSecret, Secret, SecretProvider, StaticSecret, Submission};
pub use desk::{Answer, KnowledgeDesk};
pub use entry::{EntryId, KnowledgeEntry, NewEntry};
pub use error::{AgriError, AgriResult, AuthorizationError, ValidationError};
pub use escalation::{EscalatedQuery, EscalationId, NewEscalation};
pub use matching::{MatchConfig, MatchEngine, MatchField, MatchResult};
pub use storage::{
    EscalationQueue, InMemoryEscalationQueue, InMemoryKnowledgeStore, KnowledgeStore,
    StorageError,
};

#[cfg(feature = "persistent")]
pub use storage::{open_database, PersistentConfig, PersistentStores};
