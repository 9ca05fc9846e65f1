//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Malformed id, empty domain name, bad request payload
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Domain record not found
    #[error("Domain not found: {0}")]
    DomainNotFound(String),

    /// The randomness source could not produce a verification token
    #[error("Randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    /// DNS infrastructure failure (timeout, SERVFAIL, ...). Retryable.
    #[error("DNS lookup failed: {0}")]
    LookupTransient(String),

    /// Billing payload could not be decoded
    #[error("Billing decode error: {0}")]
    DecodeError(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Record was modified since it was read
    #[error("Conflict: {0}")]
    Conflict(String),

    /// serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration could not be loaded or is invalid
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl CoreError {
    /// Whether it is expected behavior (user input, resource does not exist, etc.) is used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added. **
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::ValidationError(_)
            | Self::DomainNotFound(_)
            | Self::DecodeError(_)
            | Self::Conflict(_) => true,
            Self::RandomnessUnavailable(_)
            | Self::LookupTransient(_)
            | Self::StorageError(_)
            | Self::SerializationError(_)
            | Self::ConfigError(_) => false,
        }
    }

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LookupTransient(_) | Self::StorageError(_) | Self::Conflict(_)
        )
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
