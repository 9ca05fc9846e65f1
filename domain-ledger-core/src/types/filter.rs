//! Query filter passed to the record store

use super::domain::{DomainRecord, DomainStatus, ListScope};

/// Predicate over domain records.
///
/// Stores translate this into their native query; [`DomainFilter::matches`]
/// is the reference semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainFilter {
    /// Allowed statuses (`None` = any)
    pub statuses: Option<Vec<DomainStatus>>,
    /// Only records with `is_public = true`
    pub public_only: bool,
}

impl DomainFilter {
    /// Every record
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Records with exactly this status
    #[must_use]
    pub fn with_status(status: DomainStatus) -> Self {
        Self {
            statuses: Some(vec![status]),
            public_only: false,
        }
    }

    /// Filter backing a list scope
    #[must_use]
    pub fn for_scope(scope: ListScope) -> Self {
        match scope {
            ListScope::Admin => Self::all(),
            ListScope::Public => Self {
                statuses: Some(vec![DomainStatus::Verified, DomainStatus::Expired]),
                public_only: true,
            },
        }
    }

    #[must_use]
    pub fn matches(&self, record: &DomainRecord) -> bool {
        if self.public_only && !record.is_public {
            return false;
        }
        self.statuses
            .as_ref()
            .is_none_or(|statuses| statuses.contains(&record.status))
    }
}
