//! End-to-end tests for the knowledge desk.
//!
//! These tests exercise the full question path through the public API:
//! - ask → match → confidence verdict
//! - curation → index rebuild → immediate visibility
//! - escalation and the generated-advice fallback
//! - index failures surfaced as typed errors

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use agrimatch::storage::sample_entries;
use agrimatch::{
    resolve_with_fallback, Advice, AdviceGenerator, AdviceRequest, AgriError, AgriResult,
    AuthorizationError, DeskConfig, EntryId, InMemoryEscalationQueue, InMemoryKnowledgeStore,
    KnowledgeDesk, KnowledgeEntry, KnowledgeStore, MatchField, NewEntry, Resolution,
    StaticSecret, StorageError, Submission, Verdict,
};

const SECRET: &str = "krishi-2024";

fn sample_desk() -> KnowledgeDesk {
    KnowledgeDesk::in_memory(
        sample_entries(),
        Arc::new(StaticSecret::new(SECRET)),
        DeskConfig::default(),
    )
    .unwrap()
}

fn blight() -> Submission {
    Submission::new("How do I control late blight?", "Spray copper oxychloride at 3 g/litre.")
        .with_crop("Potato")
        .with_tags("disease, fungus")
}

/// Knowledge store whose reads can be made to fail.
struct UnreliableStore {
    inner: InMemoryKnowledgeStore,
    fail_list: AtomicBool,
}

impl UnreliableStore {
    fn new(fail_list: bool) -> Self {
        Self {
            inner: InMemoryKnowledgeStore::with_entries(sample_entries()),
            fail_list: AtomicBool::new(fail_list),
        }
    }
}

impl KnowledgeStore for UnreliableStore {
    fn list(&self) -> Result<Vec<KnowledgeEntry>, StorageError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StorageError::Io("read timed out".to_string()));
        }
        self.inner.list()
    }

    fn append(&self, entry: NewEntry) -> Result<KnowledgeEntry, StorageError> {
        self.inner.append(entry)
    }
}

fn desk_over(store: Arc<UnreliableStore>) -> KnowledgeDesk {
    KnowledgeDesk::new(
        store,
        Arc::new(InMemoryEscalationQueue::new()),
        Arc::new(StaticSecret::new(SECRET)),
        DeskConfig::default(),
    )
    .unwrap()
}

#[test]
fn test_exact_keywords_answer_confidently() {
    let desk = sample_desk();
    let answer = desk.ask("water wheat").unwrap();

    let best = answer.best().unwrap();
    assert_eq!(best.entry.id, EntryId::new(1));
    assert_eq!(best.field, MatchField::Question);
    assert_eq!(best.confidence.value(), 100);
    assert!(answer.verdict.is_confident());
    assert!(!answer.should_offer_escalation());

    // Other candidates follow in score order.
    let scores: Vec<f64> = answer.candidates.iter().map(|c| c.raw_score).collect();
    assert!(scores.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_misspelled_question_still_matches() {
    let desk = sample_desk();
    let answer = desk.ask("aphds cottn").unwrap();

    assert_eq!(answer.candidates.len(), 1);
    assert_eq!(answer.candidates[0].entry.id, EntryId::new(2));
    assert_eq!(answer.confidence().map(|c| c.value()), Some(80));
    assert!(answer.verdict.is_confident());
}

#[test]
fn test_unrelated_question_has_no_match() {
    let desk = sample_desk();
    let answer = desk.ask("xyzzy plugh qwerty").unwrap();

    assert_eq!(answer.verdict, Verdict::NoMatch);
    assert!(answer.candidates.is_empty());
    assert!(answer.should_offer_escalation());
}

#[test]
fn test_search_is_deterministic() {
    let desk = sample_desk();
    let first = desk.search("when to harvest rice").unwrap();
    for _ in 0..5 {
        assert_eq!(desk.search("when to harvest rice").unwrap(), first);
    }
}

#[test]
fn test_wrong_secret_leaves_store_unchanged() {
    let desk = sample_desk();
    let err = desk.curate("admin", blight()).unwrap_err();

    assert!(matches!(
        err,
        AgriError::Authorization(AuthorizationError::InvalidSecret)
    ));
    assert_eq!(desk.entries().unwrap().len(), 5);
    assert!(desk.search("blight").unwrap().is_empty());
}

#[test]
fn test_curated_entry_is_searchable_immediately() {
    let desk = sample_desk();
    assert!(desk.ask("blight").unwrap().candidates.is_empty());

    let stored = desk.curate(SECRET, blight()).unwrap();
    assert_eq!(stored.id, EntryId::new(6));

    let answer = desk.ask("blight").unwrap();
    assert_eq!(answer.best().map(|b| b.entry.id), Some(stored.id));
    assert!(answer.verdict.is_confident());
    assert_eq!(desk.entries().unwrap().len(), 6);
}

#[test]
fn test_crop_defaults_to_all() {
    let desk = sample_desk();
    let stored = desk
        .curate(SECRET, Submission::new("What is vermicompost?", "Compost made by earthworms."))
        .unwrap();

    assert_eq!(stored.crop, "All");
    assert_eq!(stored.tags, "");
}

#[test]
fn test_failed_rebuild_is_reported_and_recoverable() {
    let store = Arc::new(UnreliableStore::new(false));
    let desk = desk_over(Arc::clone(&store));
    desk.rebuild_index().unwrap();

    store.fail_list.store(true, Ordering::SeqCst);
    let err = desk.curate(SECRET, blight()).unwrap_err();

    assert!(matches!(err, AgriError::IndexStale { entry_id, .. } if entry_id == EntryId::new(6)));
    assert!(err.is_retryable());
    assert!(desk.is_index_stale());
    // Searches keep working against the previous index.
    assert!(desk.search("blight").unwrap().is_empty());

    store.fail_list.store(false, Ordering::SeqCst);
    assert_eq!(desk.rebuild_index().unwrap(), 6);
    assert!(!desk.is_index_stale());
    assert_eq!(desk.search("blight").unwrap()[0].entry.id, EntryId::new(6));
}

#[test]
fn test_first_load_failure_is_index_unavailable() {
    let store = Arc::new(UnreliableStore::new(true));
    let desk = desk_over(Arc::clone(&store));

    let err = desk.ask("water wheat").unwrap_err();
    assert!(err.is_index_unavailable());

    // Once the store recovers the index is built on the next question.
    store.fail_list.store(false, Ordering::SeqCst);
    assert!(desk.ask("water wheat").unwrap().verdict.is_confident());
}

#[test]
fn test_escalation_is_independent_of_matching() {
    let desk = sample_desk();

    let confident = desk.ask("water wheat").unwrap();
    let unknown = desk.ask("xyzzy plugh").unwrap();
    desk.escalate(&confident.query, None).unwrap();
    desk.escalate(&unknown.query, Some("district: Idukki; season: monsoon")).unwrap();

    let queued = desk.escalations().unwrap();
    assert_eq!(queued.len(), 2);
    assert_eq!(queued[0].question, "water wheat");
    assert!(queued[0].id < queued[1].id);
}

struct RecordingGenerator {
    calls: AtomicUsize,
}

impl AdviceGenerator for RecordingGenerator {
    fn advise(&self, request: &AdviceRequest) -> AgriResult<Advice> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Advice::new(format!(
            "<p>Advice for <strong>{}</strong> in {}</p>",
            request.crop.as_deref().unwrap_or("any crop"),
            request.district.as_deref().unwrap_or("Kerala")
        )))
    }
}

#[test]
fn test_advice_fallback_only_when_not_confident() {
    let desk = sample_desk();
    let generator = RecordingGenerator {
        calls: AtomicUsize::new(0),
    };

    let known = desk.ask("water wheat").unwrap();
    let resolution =
        resolve_with_fallback(known, &AdviceRequest::new("water wheat"), &generator).unwrap();
    assert!(matches!(resolution, Resolution::Knowledge(_)));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

    let unknown = desk.ask("banana bunchy top virus").unwrap();
    let request = AdviceRequest::new("banana bunchy top virus")
        .with_crop("Banana")
        .with_district("Wayanad")
        .with_season("Kharif");
    let resolution = resolve_with_fallback(unknown, &request, &generator).unwrap();

    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        resolution.advice().map(|a| a.markup.as_str()),
        Some("<p>Advice for <strong>Banana</strong> in Wayanad</p>")
    );
}

#[test]
fn test_concurrent_questions_during_curation() {
    let desk = Arc::new(sample_desk());
    desk.rebuild_index().unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let desk = Arc::clone(&desk);
            thread::spawn(move || {
                for _ in 0..50 {
                    let answer = desk.ask("water wheat").unwrap();
                    assert_eq!(answer.best().map(|b| b.entry.id), Some(EntryId::new(1)));
                }
            })
        })
        .collect();

    let writer = {
        let desk = Arc::clone(&desk);
        thread::spawn(move || {
            for i in 0..10 {
                let stored = desk
                    .curate(
                        SECRET,
                        Submission::new(format!("coconut mite question {i}"), "Use neem oil."),
                    )
                    .unwrap();
                // Visible to any search starting after curate returns.
                let hits = desk.search(&format!("coconut mite question {i}")).unwrap();
                assert!(hits.iter().any(|h| h.entry.id == stored.id));
            }
        })
    };

    for reader in readers {
        reader.join().unwrap();
    }
    writer.join().unwrap();

    assert_eq!(desk.entries().unwrap().len(), 15);
}
