//! DNS TXT lookup abstraction

use async_trait::async_trait;
use thiserror::Error;

/// Why a TXT lookup produced no records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// NXDOMAIN or no TXT records published. A normal negative answer.
    #[error("no TXT records found")]
    NotFound,

    /// Timeout, SERVFAIL, network unreachable, ...
    #[error("transient DNS failure: {0}")]
    Transient(String),
}

/// TXT record lookup capability
///
/// Platform implementation:
/// - `HickoryTxtResolver` (`hickory-resolver`, in `domain-ledger-app`)
#[async_trait]
pub trait TxtResolver: Send + Sync {
    /// Return the TXT values published at `name`.
    ///
    /// Each value is the concatenation of one record's character-strings.
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, LookupError>;
}
