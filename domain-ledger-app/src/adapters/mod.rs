//! Storage and DNS adapters for the CLI front end.

mod dns;

pub use dns::{HickoryTxtResolver, ResolverSettings};

#[cfg(feature = "sqlite-store")]
mod sqlite;

#[cfg(feature = "sqlite-store")]
pub use sqlite::SqliteStore;
