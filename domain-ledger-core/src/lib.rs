//! Domain Ledger Core Library
//!
//! Provides the business logic for tracking operator-owned domains:
//! - Ownership verification through DNS TXT tokens
//! - Billing payload codec
//! - Lifecycle engine (renew / expire decisions)
//! - Periodic reconciliation of verified domains
//!
//! Storage, DNS resolution and randomness are abstracted through traits,
//! so the same services run against `SQLite`, in-memory stores or test doubles.

pub mod error;
pub mod services;
pub mod traits;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use error::{CoreError, CoreResult};
pub use services::ServiceContext;
pub use traits::{DomainRepository, RandomSource, TxtResolver};
