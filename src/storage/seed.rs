//! Sample knowledge entries used to bootstrap a fresh database.

use crate::entry::{EntryId, KnowledgeEntry};

const SAMPLES: [(&str, &str, &str, &str); 5] = [
    (
        "How often should I water wheat?",
        "Wheat irrigation depends on soil and stage — generally check soil moisture and aim for 7–10 day intervals in dry spells.",
        "Wheat",
        "irrigation",
    ),
    (
        "How to control aphids on cotton?",
        "Try neem oil spray, insecticidal soap, or natural predators like ladybugs; avoid heavy spraying during flowering.",
        "Cotton",
        "pest",
    ),
    (
        "When to harvest rice?",
        "Harvest when grains are hard and have yellow/brown color; check moisture content with local lab or dryer.",
        "Rice",
        "harvest",
    ),
    (
        "How to test soil pH?",
        "Use a home pH test kit or take a sample to a local agricultural lab (Krishi Vigyan Kendra).",
        "All",
        "soil",
    ),
    (
        "Where to sell crops near me?",
        "Check nearest mandi prices and the e-NAM platform; compare buyers before selling.",
        "All",
        "market",
    ),
];

/// The five starter entries, ids 1 through 5.
#[must_use]
pub fn sample_entries() -> Vec<KnowledgeEntry> {
    SAMPLES
        .iter()
        .zip(1u64..)
        .map(|(&(question, answer, crop, tags), id)| KnowledgeEntry {
            id: EntryId::new(id),
            question: question.to_string(),
            answer: answer.to_string(),
            crop: crop.to_string(),
            tags: tags.to_string(),
        })
        .collect()
}
