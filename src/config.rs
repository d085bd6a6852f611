//! Desk configuration.
//!
//! Defaults reproduce the reference behavior: match threshold 0.45, proximity
//! distance 100, confidence threshold 60%. [`DeskConfig::from_env`] layers
//! environment overrides on top of the defaults.

use std::env;
use std::str::FromStr;

use crate::confidence::ConfidencePolicy;
use crate::error::ValidationError;
use crate::matching::MatchConfig;

#[cfg(feature = "persistent")]
use crate::storage::PersistentConfig;

/// Overrides `MatchConfig::threshold`.
pub const ENV_MATCH_THRESHOLD: &str = "AGRIMATCH_MATCH_THRESHOLD";
/// Overrides `MatchConfig::distance`; `0` or `none` disables proximity.
pub const ENV_MATCH_DISTANCE: &str = "AGRIMATCH_MATCH_DISTANCE";
/// Overrides `ConfidencePolicy::threshold`.
pub const ENV_CONFIDENCE_THRESHOLD: &str = "AGRIMATCH_CONFIDENCE_THRESHOLD";
/// Overrides `PersistentConfig::sync_on_write`.
pub const ENV_SYNC_ON_WRITE: &str = "AGRIMATCH_SYNC_ON_WRITE";

/// Everything a [`KnowledgeDesk`](crate::KnowledgeDesk) needs to be tuned.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeskConfig {
    /// Matcher tuning.
    pub matching: MatchConfig,
    /// Confidence gate.
    pub confidence: ConfidencePolicy,
    /// Durable storage options.
    #[cfg(feature = "persistent")]
    pub persistent: PersistentConfig,
}

impl DeskConfig {
    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns the first section's validation error.
    pub fn validate(self) -> Result<Self, ValidationError> {
        self.matching.validate()?;
        self.confidence.validate()?;
        Ok(self)
    }

    /// Defaults overridden by the `AGRIMATCH_*` environment variables.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if a variable is set but malformed, or the result fails
    /// [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ValidationError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MATCH_THRESHOLD) {
            config.matching.threshold = parse(ENV_MATCH_THRESHOLD, &raw)?;
        }

        if let Some(raw) = lookup(ENV_MATCH_DISTANCE) {
            let raw = raw.trim();
            config.matching.distance = if raw.eq_ignore_ascii_case("none") {
                None
            } else {
                match parse::<usize>(ENV_MATCH_DISTANCE, raw)? {
                    0 => None,
                    d => Some(d),
                }
            };
        }

        if let Some(raw) = lookup(ENV_CONFIDENCE_THRESHOLD) {
            config.confidence.threshold = parse(ENV_CONFIDENCE_THRESHOLD, &raw)?;
        }

        #[cfg(feature = "persistent")]
        if let Some(raw) = lookup(ENV_SYNC_ON_WRITE) {
            config.persistent.sync_on_write = parse_bool(ENV_SYNC_ON_WRITE, &raw)?;
        }

        config.validate()
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, ValidationError> {
    raw.trim().parse().map_err(|_| ValidationError::InvalidConfig {
        reason: format!("{key}={raw:?} is not a valid value"),
    })
}

#[cfg(feature = "persistent")]
fn parse_bool(key: &str, raw: &str) -> Result<bool, ValidationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ValidationError::InvalidConfig {
            reason: format!("{key}={raw:?} is not a boolean"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = DeskConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DeskConfig::default());
        assert!((config.matching.threshold - 0.45).abs() < f64::EPSILON);
        assert_eq!(config.matching.distance, Some(100));
        assert_eq!(config.confidence.threshold, 60);
    }

    #[test]
    fn test_overrides_apply() {
        let config = DeskConfig::from_lookup(lookup(&[
            (ENV_MATCH_THRESHOLD, "0.3"),
            (ENV_MATCH_DISTANCE, "none"),
            (ENV_CONFIDENCE_THRESHOLD, " 75 "),
        ]))
        .unwrap();

        assert!((config.matching.threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.matching.distance, None);
        assert_eq!(config.confidence.threshold, 75);

        let config = DeskConfig::from_lookup(lookup(&[(ENV_MATCH_DISTANCE, "0")])).unwrap();
        assert_eq!(config.matching.distance, None);
    }

    #[cfg(feature = "persistent")]
    #[test]
    fn test_sync_on_write_override() {
        let config = DeskConfig::from_lookup(lookup(&[(ENV_SYNC_ON_WRITE, "off")])).unwrap();
        assert!(!config.persistent.sync_on_write);

        let err = DeskConfig::from_lookup(lookup(&[(ENV_SYNC_ON_WRITE, "sometimes")])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig { .. }));
    }

    #[test]
    fn test_malformed_and_out_of_range_rejected() {
        let err = DeskConfig::from_lookup(lookup(&[(ENV_MATCH_THRESHOLD, "loose")])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig { .. }));

        let err = DeskConfig::from_lookup(lookup(&[(ENV_MATCH_THRESHOLD, "1.5")])).unwrap_err();
        assert!(matches!(err, ValidationError::ThresholdOutOfRange { .. }));

        let err =
            DeskConfig::from_lookup(lookup(&[(ENV_CONFIDENCE_THRESHOLD, "101")])).unwrap_err();
        assert!(matches!(err, ValidationError::ThresholdOutOfRange { .. }));
    }
}
