//! DNS TXT ownership verification

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::traits::{LookupError, TxtResolver};
use crate::types::{DomainRecord, DomainStatus};

/// Result of checking a domain's TXT records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Already verified, no lookup performed
    AlreadyVerified,
    /// Token found in the TXT records
    Matched,
    /// TXT records exist but none equals the token
    TokenNotFound,
    /// Domain has no TXT records or does not resolve
    NoRecords,
}

impl VerificationOutcome {
    #[must_use]
    pub fn is_verified(self) -> bool {
        matches!(self, Self::AlreadyVerified | Self::Matched)
    }

    /// Caller-facing message
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::AlreadyVerified => "Domain is already verified",
            Self::Matched => "Verification succeeded, domain status updated",
            Self::TokenNotFound | Self::NoRecords => {
                "Verification failed, no matching TXT record found"
            }
        }
    }
}

/// Checks TXT records against a record's verification token.
#[derive(Clone)]
pub struct DomainVerifier {
    resolver: Arc<dyn TxtResolver>,
}

impl DomainVerifier {
    #[must_use]
    pub fn new(resolver: Arc<dyn TxtResolver>) -> Self {
        Self { resolver }
    }

    /// Look up the domain's TXT records and compare them with its token.
    ///
    /// Does not modify the record; the caller persists a `Matched` outcome.
    ///
    /// # Errors
    /// `LookupTransient` when DNS could not answer; "not found" is an outcome, not an error.
    pub async fn check(&self, record: &DomainRecord) -> CoreResult<VerificationOutcome> {
        if record.status == DomainStatus::Verified {
            return Ok(VerificationOutcome::AlreadyVerified);
        }

        let values = match self.resolver.lookup_txt(&record.name).await {
            Ok(values) => values,
            Err(LookupError::NotFound) => {
                log::debug!("No TXT records for {}", record.name);
                return Ok(VerificationOutcome::NoRecords);
            }
            Err(LookupError::Transient(msg)) => {
                return Err(CoreError::LookupTransient(format!("{}: {msg}", record.name)));
            }
        };

        if token_present(&values, &record.verify_token) {
            Ok(VerificationOutcome::Matched)
        } else {
            log::debug!(
                "{} TXT records for {} did not contain the token",
                values.len(),
                record.name
            );
            Ok(VerificationOutcome::TokenNotFound)
        }
    }
}

/// Exact, byte-for-byte token comparison. An empty token never matches.
fn token_present(values: &[String], token: &str) -> bool {
    !token.is_empty() && values.iter().any(|v| v == token)
}
