//! Confidence scoring and the answer/escalate decision.
//!
//! A raw match score lives in `[0, 1]` with 0 meaning a perfect match. It is
//! turned into a percentage (`round((1 - score) * 100)`) and compared against
//! a threshold to decide whether the best match can be presented as an answer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::matching::MatchResult;

/// Confidence expressed as an integer percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfidencePercent(u8);

impl ConfidencePercent {
    /// Full confidence.
    pub const MAX: Self = Self(100);

    /// No confidence.
    pub const MIN: Self = Self(0);

    /// Creates a percentage, clamping values above 100.
    #[must_use]
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    /// Converts a raw match score into a percentage.
    ///
    /// Scores outside `[0, 1]` are clamped; NaN is treated as "no similarity".
    #[must_use]
    pub fn from_raw_score(raw_score: f64) -> Self {
        let score = if raw_score.is_nan() {
            1.0
        } else {
            raw_score.clamp(0.0, 1.0)
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = ((1.0 - score) * 100.0).round() as u8;
        Self::new(percent)
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ConfidencePercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Outcome of assessing a ranked result list.
///
/// "No match" and "match but not confident" are separate variants so the
/// distinction survives up to whatever renders the answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Nothing in the knowledge base was similar enough to rank.
    NoMatch,

    /// A best match exists but falls below the confidence threshold.
    Uncertain {
        /// The top-ranked candidate.
        best: MatchResult,
    },

    /// The best match clears the confidence threshold.
    Confident {
        /// The top-ranked candidate.
        best: MatchResult,
    },
}

impl Verdict {
    /// Returns true if the answer can be presented outright.
    #[must_use]
    pub const fn is_confident(&self) -> bool {
        matches!(self, Self::Confident { .. })
    }

    /// Returns true if the caller should suggest expert review (or an advice fallback).
    #[must_use]
    pub const fn should_offer_escalation(&self) -> bool {
        !self.is_confident()
    }

    /// The top candidate, if any.
    #[must_use]
    pub const fn best(&self) -> Option<&MatchResult> {
        match self {
            Self::NoMatch => None,
            Self::Uncertain { best } | Self::Confident { best } => Some(best),
        }
    }

    /// Confidence of the top candidate; `None` when there was no match.
    #[must_use]
    pub fn confidence(&self) -> Option<ConfidencePercent> {
        self.best().map(|b| b.confidence)
    }
}

/// Decides whether a match is confident enough to present as an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidencePolicy {
    /// Minimum percentage (inclusive) for a confident answer.
    pub threshold: u8,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }
}

impl ConfidencePolicy {
    /// Default confidence threshold.
    pub const DEFAULT_THRESHOLD: u8 = 60;

    /// Creates a policy with the given threshold.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ThresholdOutOfRange` if `threshold > 100`.
    pub fn new(threshold: u8) -> Result<Self, ValidationError> {
        Self { threshold }.validate()
    }

    /// Checks the threshold is a valid percentage.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ThresholdOutOfRange` if `threshold > 100`.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.threshold > 100 {
            return Err(ValidationError::ThresholdOutOfRange {
                name: "confidence_threshold",
                value: f64::from(self.threshold),
            });
        }
        Ok(self)
    }

    /// Converts a raw score into a confidence percentage.
    #[must_use]
    pub fn confidence_percent(&self, raw_score: f64) -> ConfidencePercent {
        ConfidencePercent::from_raw_score(raw_score)
    }

    /// Returns true iff `percent` reaches the threshold.
    #[must_use]
    pub fn is_confident(&self, percent: ConfidencePercent) -> bool {
        percent.value() >= self.threshold
    }

    /// Assesses a ranked result list (best first).
    #[must_use]
    pub fn assess(&self, results: &[MatchResult]) -> Verdict {
        let Some(best) = results.first() else {
            return Verdict::NoMatch;
        };

        if self.is_confident(best.confidence) {
            Verdict::Confident { best: best.clone() }
        } else {
            Verdict::Uncertain { best: best.clone() }
        }
    }
}
