//! Generated-advice fallback for questions the knowledge base cannot answer.
//!
//! Generation itself happens outside this crate, behind [`AdviceGenerator`].
//! This module only decides when to call it: never for a confident answer,
//! always otherwise.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::desk::Answer;
use crate::error::AgriResult;

/// Language requested when the caller gives none.
pub const DEFAULT_LANGUAGE: &str = "English";

/// A farmer's question with the context a generator needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceRequest {
    /// The question as asked.
    pub question: String,
    /// Crop the question is about.
    #[serde(default)]
    pub crop: Option<String>,
    /// District the farmer is in.
    #[serde(default)]
    pub district: Option<String>,
    /// Growing season.
    #[serde(default)]
    pub season: Option<String>,
    /// Language the advice should be written in.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl AdviceRequest {
    /// A request with no context, in the default language.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            crop: None,
            district: None,
            season: None,
            language: default_language(),
        }
    }

    /// Sets the crop.
    #[must_use]
    pub fn with_crop(mut self, crop: impl Into<String>) -> Self {
        self.crop = Some(crop.into());
        self
    }

    /// Sets the district.
    #[must_use]
    pub fn with_district(mut self, district: impl Into<String>) -> Self {
        self.district = Some(district.into());
        self
    }

    /// Sets the season.
    #[must_use]
    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    /// Sets the language. A blank value keeps the default.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !language.trim().is_empty() {
            self.language = language;
        }
        self
    }
}

/// Generated advice, as structured markup.
///
/// Passed to the caller exactly as the generator produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    /// Markup returned by the generator.
    pub markup: String,
}

impl Advice {
    /// Wraps generator output.
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }
}

/// External natural-language advice generator.
pub trait AdviceGenerator: Send + Sync {
    /// Produces advice for `request`.
    ///
    /// # Errors
    ///
    /// Implementations report their failures as `AgriError::Advice`.
    fn advise(&self, request: &AdviceRequest) -> AgriResult<Advice>;
}

/// How a question was finally answered.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The knowledge base answered with confidence.
    Knowledge(Answer),
    /// The knowledge base was not confident; advice was generated.
    Generated {
        /// The knowledge-base outcome, kept for display and escalation.
        answer: Answer,
        /// The generator's output.
        advice: Advice,
    },
}

impl Resolution {
    /// The knowledge-base outcome.
    #[must_use]
    pub const fn answer(&self) -> &Answer {
        match self {
            Self::Knowledge(answer) | Self::Generated { answer, .. } => answer,
        }
    }

    /// The generated advice, if the generator was consulted.
    #[must_use]
    pub const fn advice(&self) -> Option<&Advice> {
        match self {
            Self::Knowledge(_) => None,
            Self::Generated { advice, .. } => Some(advice),
        }
    }
}

/// Returns `answer` unchanged if it is confident, otherwise asks `generator`.
///
/// # Errors
///
/// Propagates the generator's error. The generator is never called for a
/// confident answer, so that path cannot fail.
pub fn resolve_with_fallback(
    answer: Answer,
    request: &AdviceRequest,
    generator: &dyn AdviceGenerator,
) -> AgriResult<Resolution> {
    if answer.verdict.is_confident() {
        return Ok(Resolution::Knowledge(answer));
    }

    debug!(language = %request.language, "knowledge base not confident, generating advice");
    let advice = generator.advise(request)?;
    Ok(Resolution::Generated { answer, advice })
}
