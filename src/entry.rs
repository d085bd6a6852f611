//! Knowledge entries: the curated question/answer pairs that queries are matched against.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Crop label used when an entry does not name a crop.
pub const DEFAULT_CROP: &str = "All";

/// Maximum length (in characters) accepted for any free-text field.
pub const MAX_TEXT_LEN: usize = 8 * 1024;

/// Identifier of a knowledge entry.
///
/// Assigned by the store as `max(existing) + 1`, starting at 1. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the identifier following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_crop() -> String {
    DEFAULT_CROP.to_string()
}

/// A stored question/answer pair.
///
/// Entries are append-only: once stored they are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Unique, store-assigned id.
    pub id: EntryId,
    /// The farmer-facing question.
    pub question: String,
    /// Expert answer returned when the entry matches.
    pub answer: String,
    /// Crop the entry applies to, `"All"` when not crop specific.
    #[serde(default = "default_crop")]
    pub crop: String,
    /// Free-text keywords, possibly empty.
    #[serde(default)]
    pub tags: String,
}

/// A validated entry that has not been assigned an id yet.
///
/// The only way to build one is [`NewEntry::new`], so stores never see
/// an empty question or answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    question: String,
    answer: String,
    crop: String,
    tags: String,
}

impl NewEntry {
    /// Validates and normalizes the fields of a new entry.
    ///
    /// Question and answer are trimmed; a missing or blank crop becomes `"All"`,
    /// missing tags become the empty string.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyField` if the question or answer is blank,
    /// `ValidationError::FieldTooLong` if any field exceeds [`MAX_TEXT_LEN`].
    pub fn new(
        question: &str,
        answer: &str,
        crop: Option<&str>,
        tags: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let question = required_text("question", question)?;
        let answer = required_text("answer", answer)?;
        let crop = match crop.map(str::trim) {
            Some(c) if !c.is_empty() => bounded_text("crop", c)?,
            _ => default_crop(),
        };
        let tags = bounded_text("tags", tags.map_or("", str::trim))?;

        Ok(Self {
            question,
            answer,
            crop,
            tags,
        })
    }

    /// The trimmed question.
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Assigns an id, producing the stored form.
    #[must_use]
    pub fn into_entry(self, id: EntryId) -> KnowledgeEntry {
        KnowledgeEntry {
            id,
            question: self.question,
            answer: self.answer,
            crop: self.crop,
            tags: self.tags,
        }
    }
}

/// Trims `value` and rejects it if empty or oversized.
pub(crate) fn required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    bounded_text(field, trimmed)
}

pub(crate) fn bounded_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::FieldTooLong {
            field,
            max_length: MAX_TEXT_LEN,
        });
    }
    Ok(value.to_string())
}

/// Next id for a collection: `max + 1`, or 1 when empty.
pub(crate) fn next_entry_id(entries: &[KnowledgeEntry]) -> EntryId {
    entries
        .iter()
        .map(|e| e.id)
        .max()
        .map_or(EntryId::new(1), EntryId::next)
}
