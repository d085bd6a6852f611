//! Approximate substring scoring.
//!
//! The core measure is the smallest edit distance between a pattern and any
//! substring of a text (Sellers' variant of the Levenshtein recurrence, where
//! the match may begin and end anywhere in the text). Scores are normalized by
//! pattern length so 0 is an exact occurrence and 1 shares nothing.

use super::tokenize;

/// Longest normalized query that is scored. Scoring cost grows with query
/// length times field length, so anything past this is dropped.
pub const MAX_QUERY_CHARS: usize = 256;

/// Best approximate occurrence of a pattern inside a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// Edit operations needed to turn the matched substring into the pattern.
    pub errors: usize,
    /// Character offset in the text where the matched substring begins.
    pub start: usize,
}

/// Finds the occurrence of `pattern` in `text` with the fewest errors,
/// preferring the earliest start among equally good occurrences.
pub fn best_occurrence(pattern: &[char], text: &[char]) -> Occurrence {
    let m = pattern.len();
    let mut best = Occurrence { errors: m, start: 0 };
    if m == 0 {
        return best;
    }

    // Row i holds the cost of aligning pattern[..i] so it ends at the current text column.
    let mut prev_cost: Vec<usize> = (0..=m).collect();
    let mut prev_start = vec![0usize; m + 1];
    let mut cur_cost = vec![0usize; m + 1];
    let mut cur_start = vec![0usize; m + 1];

    for (j, &tc) in text.iter().enumerate() {
        cur_cost[0] = 0;
        cur_start[0] = j + 1;

        for i in 1..=m {
            let mut cost = prev_cost[i - 1] + usize::from(pattern[i - 1] != tc);
            let mut start = prev_start[i - 1];

            let extra_text = prev_cost[i] + 1;
            if extra_text < cost {
                cost = extra_text;
                start = prev_start[i];
            }

            let missing_pattern = cur_cost[i - 1] + 1;
            if missing_pattern < cost {
                cost = missing_pattern;
                start = cur_start[i - 1];
            }

            cur_cost[i] = cost;
            cur_start[i] = start;
        }

        let end_cost = cur_cost[m];
        if end_cost < best.errors || (end_cost == best.errors && cur_start[m] < best.start) {
            best = Occurrence {
                errors: end_cost,
                start: cur_start[m],
            };
            if best.errors == 0 {
                break;
            }
        }

        std::mem::swap(&mut prev_cost, &mut cur_cost);
        std::mem::swap(&mut prev_start, &mut cur_start);
    }

    best
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// A query normalized once and reused against every indexed field.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    phrase: Vec<char>,
    tokens: Vec<Vec<char>>,
}

impl PreparedQuery {
    /// Normalizes and tokenizes `query`, keeping at most [`MAX_QUERY_CHARS`]
    /// normalized characters.
    pub fn new(query: &str) -> Self {
        let mut normalized = tokenize::normalize(query);
        if let Some((cut, _)) = normalized.char_indices().nth(MAX_QUERY_CHARS) {
            normalized.truncate(cut);
            normalized.truncate(normalized.trim_end().len());
        }
        let tokens = tokenize::tokens(&normalized)
            .map(|t| t.chars().collect())
            .collect();
        Self {
            phrase: normalized.chars().collect(),
            tokens,
        }
    }

    /// True when the query has nothing left to match after normalization.
    pub fn is_empty(&self) -> bool {
        self.phrase.is_empty()
    }
}

/// Scores normalized fields against a prepared query.
#[derive(Debug, Clone, Copy)]
pub struct FieldScorer {
    /// Per-token error ratio above which a token counts as missed.
    pub token_cutoff: f64,
    /// Proximity window for phrase matches; `None` ignores match position.
    pub distance: Option<usize>,
}

impl FieldScorer {
    /// Score of `field` against `query`: the lower of the phrase and token scores.
    pub fn score(&self, query: &PreparedQuery, field: &[char]) -> f64 {
        if query.is_empty() || field.is_empty() {
            return 1.0;
        }
        let phrase = self.phrase_score(&query.phrase, field);
        if phrase == 0.0 {
            return phrase;
        }
        phrase.min(self.token_score(&query.tokens, field))
    }

    /// Whole-query score, penalized by how far into the field the match starts.
    pub fn phrase_score(&self, phrase: &[char], field: &[char]) -> f64 {
        let occurrence = best_occurrence(phrase, field);
        let accuracy = ratio(occurrence.errors, phrase.len());
        let proximity = match self.distance {
            Some(distance) => ratio(occurrence.start, distance),
            None => 0.0,
        };
        (accuracy + proximity).min(1.0)
    }

    /// Token-length-weighted mean of per-token scores; position is ignored.
    pub fn token_score(&self, tokens: &[Vec<char>], field: &[char]) -> f64 {
        let total_len: usize = tokens.iter().map(Vec::len).sum();
        if total_len == 0 {
            return 1.0;
        }

        let mut weighted_errors = 0.0;
        for token in tokens {
            let occurrence = best_occurrence(token, field);
            let token_ratio = ratio(occurrence.errors, token.len());
            let token_score = if token_ratio > self.token_cutoff {
                1.0
            } else {
                token_ratio
            };
            #[allow(clippy::cast_precision_loss)]
            {
                weighted_errors += token_score * token.len() as f64;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let score = weighted_errors / total_len as f64;
        score.min(1.0)
    }
}
