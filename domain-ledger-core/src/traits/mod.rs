//! Storage and capability abstraction traits

mod domain_repository;
mod random_source;
mod txt_resolver;

pub use domain_repository::{DomainRepository, InMemoryDomainRepository};
pub use random_source::{OsRandomSource, RandomSource};
pub use txt_resolver::{LookupError, TxtResolver};
