//! Escalated queries: questions a farmer has asked to be reviewed by a human expert.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{bounded_text, required_text};
use crate::error::ValidationError;

/// Identifier of an escalated query.
///
/// Derived from the creation time in milliseconds since the Unix epoch, bumped
/// past the previous id when two escalations land in the same millisecond, so
/// ids are unique and increase in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EscalationId(u64);

impl EscalationId {
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

    /// Allocates the id for an escalation created at `now`.
    #[must_use]
    pub fn allocate(previous: Option<Self>, now: DateTime<Utc>) -> Self {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        match previous {
            Some(prev) if prev.0 >= millis => Self(prev.0 + 1),
            _ => Self(millis),
        }
    }
}

impl fmt::Display for EscalationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A question queued for expert review. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalatedQuery {
    /// Queue-assigned id, strictly increasing in queue order.
    pub id: EscalationId,
    /// The question as the farmer asked it.
    pub question: String,
    /// Optional context such as district or season.
    #[serde(default)]
    pub metadata: Option<String>,
    /// When the question was queued.
    pub timestamp: DateTime<Utc>,
}

/// A validated escalation request awaiting id and timestamp assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEscalation {
    question: String,
    metadata: Option<String>,
}

impl NewEscalation {
    /// Validates an escalation request. Blank metadata is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyField` if the question is blank.
    pub fn new(question: &str, metadata: Option<&str>) -> Result<Self, ValidationError> {
        let question = required_text("question", question)?;
        let metadata = match metadata.map(str::trim) {
            Some(m) if !m.is_empty() => Some(bounded_text("metadata", m)?),
            _ => None,
        };
        Ok(Self { question, metadata })
    }

    /// Stamps the request with its id and creation time.
    #[must_use]
    pub fn into_query(self, id: EscalationId, timestamp: DateTime<Utc>) -> EscalatedQuery {
        EscalatedQuery {
            id,
            question: self.question,
            metadata: self.metadata,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_allocate_uses_clock() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(EscalationId::allocate(None, now).get(), 1_700_000_000_123);
    }

    #[test]
    fn test_allocate_same_millisecond_is_unique() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let first = EscalationId::allocate(None, now);
        let second = EscalationId::allocate(Some(first), now);
        let third = EscalationId::allocate(Some(second), now);
        assert!(first < second && second < third);
    }

    #[test]
    fn test_allocate_survives_clock_going_backwards() {
        let later = Utc.timestamp_millis_opt(2_000).unwrap();
        let earlier = Utc.timestamp_millis_opt(1_000).unwrap();
        let first = EscalationId::allocate(None, later);
        let second = EscalationId::allocate(Some(first), earlier);
        assert_eq!(second.get(), 2_001);
    }

    #[test]
    fn test_new_escalation_validation() {
        assert_eq!(
            NewEscalation::new("   ", None),
            Err(ValidationError::EmptyField { field: "question" })
        );

        let req = NewEscalation::new(" leaves turning yellow ", Some("  ")).unwrap();
        let query = req.into_query(EscalationId::new(1), Utc::now());
        assert_eq!(query.question, "leaves turning yellow");
        assert_eq!(query.metadata, None);
    }
}
