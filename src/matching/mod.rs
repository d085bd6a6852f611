//! Fuzzy multi-field search over knowledge entries.
//!
//! The [`MatchEngine`] owns a derived, read-only index built from a snapshot of
//! the knowledge store. Every field of every entry (`question`, `answer`,
//! `tags`, `crop`) is normalized once at build time; a search scores each field
//! with [`fuzzy::FieldScorer`] and keeps the best field per entry.
//!
//! # Concurrency
//!
//! The index lives behind `RwLock<Option<Arc<_>>>`. `build` prepares the new
//! index without holding the lock and then swaps it in with a single write, so
//! a search in flight keeps the `Arc` it started with and sees either the old or
//! the new index in full.

pub mod fuzzy;
pub mod tokenize;

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::confidence::ConfidencePercent;
use crate::entry::KnowledgeEntry;
use crate::error::{AgriError, AgriResult, ValidationError};

use fuzzy::{FieldScorer, PreparedQuery};

pub use fuzzy::MAX_QUERY_CHARS;

/// Searchable field of a knowledge entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    /// The entry's question text.
    Question,
    /// The entry's answer text.
    Answer,
    /// The entry's tag list.
    Tags,
    /// The entry's crop name.
    Crop,
}

impl MatchField {
    /// All searchable fields. Earlier fields win ties.
    pub const ALL: [Self; 4] = [Self::Question, Self::Answer, Self::Tags, Self::Crop];

    fn text(self, entry: &KnowledgeEntry) -> &str {
        match self {
            Self::Question => &entry.question,
            Self::Answer => &entry.answer,
            Self::Tags => &entry.tags,
            Self::Crop => &entry.crop,
        }
    }
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Question => write!(f, "question"),
            Self::Answer => write!(f, "answer"),
            Self::Tags => write!(f, "tags"),
            Self::Crop => write!(f, "crop"),
        }
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The matched entry.
    pub entry: KnowledgeEntry,
    /// Best field score in `[0, 1]`; 0 is a perfect match.
    pub raw_score: f64,
    /// `round((1 - raw_score) * 100)`.
    pub confidence: ConfidencePercent,
    /// Field that produced `raw_score`.
    pub field: MatchField,
}

impl MatchResult {
    /// Builds a result, deriving the confidence from the raw score.
    #[must_use]
    pub fn new(entry: KnowledgeEntry, raw_score: f64, field: MatchField) -> Self {
        Self {
            entry,
            raw_score,
            confidence: ConfidencePercent::from_raw_score(raw_score),
            field,
        }
    }
}

/// Tuning for the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Entries whose best score exceeds this value are dropped from results.
    pub threshold: f64,
    /// Characters from the start of a field after which a phrase match costs
    /// a full point of score; `None` ignores where the match occurs.
    pub distance: Option<usize>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            distance: Some(Self::DEFAULT_DISTANCE),
        }
    }
}

impl MatchConfig {
    /// Default match threshold.
    pub const DEFAULT_THRESHOLD: f64 = 0.45;

    /// Default proximity window.
    pub const DEFAULT_DISTANCE: usize = 100;

    /// Checks the threshold is within `[0, 1]` and the distance is non-zero.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ThresholdOutOfRange` or `ValidationError::InvalidConfig`.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ValidationError::ThresholdOutOfRange {
                name: "match_threshold",
                value: self.threshold,
            });
        }
        if self.distance == Some(0) {
            return Err(ValidationError::InvalidConfig {
                reason: "match distance must be positive (use None to ignore location)".to_string(),
            });
        }
        Ok(self)
    }

    fn scorer(self) -> FieldScorer {
        FieldScorer {
            token_cutoff: self.threshold,
            distance: self.distance,
        }
    }
}

#[derive(Debug)]
struct IndexedEntry {
    entry: KnowledgeEntry,
    fields: [(MatchField, Vec<char>); 4],
}

impl IndexedEntry {
    fn new(entry: KnowledgeEntry) -> Self {
        let fields = MatchField::ALL
            .map(|field| (field, tokenize::normalize(field.text(&entry)).chars().collect()));
        Self { entry, fields }
    }
}

#[derive(Debug, Default)]
struct MatchIndex {
    entries: Vec<IndexedEntry>,
}

/// Fuzzy search engine over a rebuildable index.
#[derive(Debug)]
pub struct MatchEngine {
    config: MatchConfig,
    index: RwLock<Option<Arc<MatchIndex>>>,
    stale: AtomicBool,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::with_config(MatchConfig::default())
    }
}

impl MatchEngine {
    /// Creates an engine with no index. `search` fails until `build` is called.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `config` is out of range, including a NaN
    /// threshold, which would otherwise exclude every entry.
    pub fn new(config: MatchConfig) -> Result<Self, ValidationError> {
        Ok(Self::with_config(config.validate()?))
    }

    fn with_config(config: MatchConfig) -> Self {
        Self {
            config,
            index: RwLock::new(None),
            stale: AtomicBool::new(false),
        }
    }

    /// The matcher configuration.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Replaces the index with one built from `entries`. Returns the number indexed.
    ///
    /// Nothing from a previous build survives, so rebuilding from the same
    /// entries always yields the same search results.
    pub fn build(&self, entries: Vec<KnowledgeEntry>) -> usize {
        let index = MatchIndex {
            entries: entries.into_iter().map(IndexedEntry::new).collect(),
        };
        let count = index.entries.len();

        // The guarded value is only ever replaced wholesale, so a poisoned lock still holds a complete index.
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(index));
        self.stale.store(false, AtomicOrdering::Release);

        info!(entries = count, "match index rebuilt");
        count
    }

    /// Returns true once an index has been built.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Number of indexed entries, or `None` before the first build.
    #[must_use]
    pub fn indexed_len(&self) -> Option<usize> {
        self.snapshot().map(|index| index.entries.len())
    }

    /// Flags the index as lagging behind the store.
    pub fn mark_stale(&self) {
        self.stale.store(true, AtomicOrdering::Release);
    }

    /// True if a write landed that the current index does not reflect.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale.load(AtomicOrdering::Acquire)
    }

    /// Ranks entries against `query`, best (lowest score) first.
    ///
    /// A blank query or an empty index yields no results. Entries scoring
    /// above the configured threshold never appear. Ties are ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `AgriError::IndexUnavailable` if no index has been built.
    pub fn search(&self, query: &str) -> AgriResult<Vec<MatchResult>> {
        let index = self
            .snapshot()
            .ok_or_else(|| AgriError::index_unavailable("match index has not been built"))?;

        let prepared = PreparedQuery::new(query);
        if prepared.is_empty() || index.entries.is_empty() {
            return Ok(Vec::new());
        }

        let scorer = self.config.scorer();
        let mut results: Vec<MatchResult> = index
            .entries
            .iter()
            .filter_map(|indexed| {
                let (field, score) = best_field(&scorer, &prepared, indexed);
                (score <= self.config.threshold)
                    .then(|| MatchResult::new(indexed.entry.clone(), score, field))
            })
            .collect();

        results.sort_by(|a, b| {
            a.raw_score
                .partial_cmp(&b.raw_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });

        debug!(
            query_len = query.len(),
            candidates = results.len(),
            "knowledge search executed"
        );
        Ok(results)
    }

    fn snapshot(&self) -> Option<Arc<MatchIndex>> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn best_field(
    scorer: &FieldScorer,
    query: &PreparedQuery,
    indexed: &IndexedEntry,
) -> (MatchField, f64) {
    let mut best = (MatchField::Question, f64::INFINITY);
    for (field, text) in &indexed.fields {
        let score = scorer.score(query, text);
        if score < best.1 {
            best = (*field, score);
        }
        if score == 0.0 {
            break;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryId, NewEntry};
    use crate::storage::seed::sample_entries;

    fn engine_with_samples() -> MatchEngine {
        let engine = MatchEngine::default();
        engine.build(sample_entries());
        engine
    }

    fn entry(id: u64, question: &str, answer: &str, crop: &str, tags: &str) -> KnowledgeEntry {
        NewEntry::new(question, answer, Some(crop), Some(tags))
            .unwrap()
            .into_entry(EntryId::new(id))
    }

    #[test]
    fn test_search_before_build_is_unavailable() {
        let engine = MatchEngine::default();
        assert!(!engine.is_built());
        let err = engine.search("wheat").unwrap_err();
        assert!(err.is_index_unavailable());
    }

    #[test]
    fn test_empty_query_and_empty_index() {
        let engine = engine_with_samples();
        assert!(engine.search("").unwrap().is_empty());
        assert!(engine.search("   ?!").unwrap().is_empty());

        let empty = MatchEngine::default();
        empty.build(Vec::new());
        assert!(empty.search("wheat").unwrap().is_empty());
    }

    #[test]
    fn test_water_wheat_is_confident_top_hit() {
        let engine = engine_with_samples();
        let results = engine.search("water wheat").unwrap();
        let top = &results[0];
        assert_eq!(top.entry.id, EntryId::new(1));
        assert!(top.confidence.value() >= 60, "confidence {}", top.confidence);
    }

    #[test]
    fn test_nonsense_has_no_results() {
        let engine = engine_with_samples();
        assert!(engine.search("xyzzy plugh unrelated nonsense").unwrap().is_empty());
    }

    #[test]
    fn test_misspelling_still_matches() {
        let engine = engine_with_samples();
        let results = engine.search("aphds cottn").unwrap();
        assert_eq!(results[0].entry.id, EntryId::new(2));
    }

    #[test]
    fn test_tag_and_crop_fields_are_searchable() {
        let engine = MatchEngine::default();
        engine.build(vec![
            entry(1, "When to plant?", "After the first rains.", "Sorghum", "sowing"),
            entry(2, "Best fertilizer?", "Compost.", "All", "nutrition"),
        ]);

        let by_tag = engine.search("nutrition").unwrap();
        assert_eq!(by_tag[0].entry.id, EntryId::new(2));
        assert_eq!(by_tag[0].field, MatchField::Tags);

        let by_crop = engine.search("sorghum").unwrap();
        assert_eq!(by_crop[0].entry.id, EntryId::new(1));
        assert_eq!(by_crop[0].field, MatchField::Crop);
    }

    #[test]
    fn test_results_sorted_and_within_threshold() {
        let engine = engine_with_samples();
        for query in ["water", "rice harvest", "soil", "pest cotton", "sell crops", "how to", "mandi prices"] {
            let results = engine.search(query).unwrap();
            for pair in results.windows(2) {
                assert!(pair[0].raw_score <= pair[1].raw_score, "unsorted for {query}");
            }
            for r in &results {
                assert!(r.raw_score <= MatchConfig::DEFAULT_THRESHOLD);
                assert!((0.0..=1.0).contains(&r.raw_score));
            }
        }
    }

    #[test]
    fn test_strict_threshold_excludes_weaker_hits() {
        let strict = MatchEngine::new(MatchConfig {
            threshold: 0.0,
            distance: Some(100),
        })
        .unwrap();
        strict.build(sample_entries());
        let results = strict.search("harvst").unwrap();
        assert!(results.is_empty());
        assert_eq!(strict.search("harvest").unwrap()[0].entry.id, EntryId::new(3));
    }

    #[test]
    fn test_oversized_query_is_scored_on_its_prefix() {
        let engine = engine_with_samples();
        let results = engine.search(&"water wheat ".repeat(2_000)).unwrap();
        assert_eq!(results[0].entry.id, EntryId::new(1));
        assert!(results[0].raw_score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let nan = MatchEngine::new(MatchConfig {
            threshold: f64::NAN,
            ..MatchConfig::default()
        });
        assert!(matches!(nan, Err(ValidationError::ThresholdOutOfRange { .. })));

        let zero_distance = MatchEngine::new(MatchConfig {
            distance: Some(0),
            ..MatchConfig::default()
        });
        assert!(matches!(zero_distance, Err(ValidationError::InvalidConfig { .. })));

        assert!(MatchEngine::new(MatchConfig::default()).is_ok());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let engine = engine_with_samples();
        let first = engine.search("soil test").unwrap();
        engine.build(sample_entries());
        let second = engine.search("soil test").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rebuild_drops_previous_entries() {
        let engine = engine_with_samples();
        engine.build(vec![entry(9, "How to treat blight?", "Copper spray.", "Potato", "disease")]);
        assert_eq!(engine.indexed_len(), Some(1));
        assert!(engine.search("harvest rice").unwrap().is_empty());
    }

    #[test]
    fn test_stale_flag_cleared_by_build() {
        let engine = engine_with_samples();
        engine.mark_stale();
        assert!(engine.is_stale());
        engine.build(sample_entries());
        assert!(!engine.is_stale());
    }

    #[test]
    fn test_config_validation() {
        assert!(MatchConfig::default().validate().is_ok());
        assert!(MatchConfig { threshold: 1.5, distance: None }.validate().is_err());
        assert!(MatchConfig { threshold: 0.3, distance: Some(0) }.validate().is_err());
    }
}
