//! Error types for agrimatch.
//!
//! All errors are strongly typed using thiserror so callers can
//! pattern match on the failure kind instead of parsing messages.

use thiserror::Error;

use crate::entry::EntryId;
use crate::storage::StorageError;

/// Validation errors that occur during input validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField {
        field: &'static str,
    },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        field: &'static str,
        max_length: usize,
    },

    #[error("Threshold '{name}' value {value} is out of range")]
    ThresholdOutOfRange {
        name: &'static str,
        value: f64,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Curation authorization failures.
///
/// A mismatch is always reported as `InvalidSecret`, whatever the presented value was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("Invalid curation secret")]
    InvalidSecret,

    #[error("No curation secret is configured")]
    SecretUnavailable,
}

/// Top-level error type for agrimatch.
#[derive(Debug, Error)]
pub enum AgriError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The match index has never been built successfully.
    #[error("Match index unavailable: {reason}")]
    IndexUnavailable {
        reason: String,
    },

    /// Entry `entry_id` is durable but the index could not be rebuilt to include it.
    #[error("Entry {entry_id} was stored but the match index is stale: {source}")]
    IndexStale {
        entry_id: EntryId,
        #[source]
        source: StorageError,
    },

    #[error("Advice generator failed: {message}")]
    Advice {
        message: String,
    },
}

impl AgriError {
    /// Creates an index-unavailable error.
    #[must_use]
    pub fn index_unavailable(reason: impl Into<String>) -> Self {
        Self::IndexUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates an advice generator error.
    #[must_use]
    pub fn advice(message: impl Into<String>) -> Self {
        Self::Advice {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an authorization error.
    #[must_use]
    pub const fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if the match index has never been built.
    #[must_use]
    pub const fn is_index_unavailable(&self) -> bool {
        matches!(self, Self::IndexUnavailable { .. })
    }

    /// Returns true if the write succeeded but the index lags behind it.
    #[must_use]
    pub const fn is_index_stale(&self) -> bool {
        matches!(self, Self::IndexStale { .. })
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// Nothing in the crate retries on its own; this only informs caller policy.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => matches!(e, StorageError::Io(_) | StorageError::Locked(_)),
            Self::IndexUnavailable { .. } | Self::IndexStale { .. } => true,
            Self::Validation(_) | Self::Authorization(_) | Self::Advice { .. } => false,
        }
    }
}

/// Result type alias for agrimatch operations.
pub type AgriResult<T> = Result<T, AgriError>;
