//! Domain record persistence abstract Trait

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::types::{DomainFilter, DomainId, DomainRecord, NewDomainRecord};

/// Domain record store Trait
///
/// Platform implementation:
/// - `SqliteStore` (`SeaORM`, in `domain-ledger-app`)
/// - `InMemoryDomainRepository` (below)
#[async_trait]
pub trait DomainRepository: Send + Sync {
    /// Find all records matching the filter, ordered by id
    async fn find(&self, filter: &DomainFilter) -> CoreResult<Vec<DomainRecord>>;

    /// Get a record based on ID
    ///
    /// # Returns
    /// * `Some(record)` - found
    /// * `None` - no such record
    async fn find_by_id(&self, id: DomainId) -> CoreResult<Option<DomainRecord>>;

    /// Insert a new record; the store assigns id, timestamps and revision
    async fn create(&self, record: NewDomainRecord) -> CoreResult<DomainRecord>;

    /// Persist a modified record
    ///
    /// The write only succeeds if the stored revision still equals `record.revision`.
    /// Returns the stored record with the bumped revision and `updated_at`.
    ///
    /// # Errors
    /// * `DomainNotFound` - the record was deleted
    /// * `Conflict` - the record was modified since it was read
    async fn save(&self, record: &DomainRecord) -> CoreResult<DomainRecord>;

    /// Delete a record (deleting a missing id is not an error)
    async fn delete(&self, id: DomainId) -> CoreResult<()>;
}

/// In-memory domain store
///
/// Default implementation, used by tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryDomainRepository {
    inner: Arc<RwLock<InMemoryState>>,
}

#[derive(Default)]
struct InMemoryState {
    next_id: DomainId,
    records: BTreeMap<DomainId, DomainRecord>,
}

impl InMemoryDomainRepository {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DomainRepository for InMemoryDomainRepository {
    async fn find(&self, filter: &DomainFilter) -> CoreResult<Vec<DomainRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: DomainId) -> CoreResult<Option<DomainRecord>> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn create(&self, record: NewDomainRecord) -> CoreResult<DomainRecord> {
        let mut state = self.inner.write().await;
        state.next_id += 1;
        let now = chrono::Utc::now();
        let stored = DomainRecord {
            id: state.next_id,
            name: record.name,
            status: record.status,
            verify_token: record.verify_token,
            is_public: record.is_public,
            billing_data: record.billing_data,
            revision: 1,
            created_at: now,
            updated_at: now,
        };
        state.records.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn save(&self, record: &DomainRecord) -> CoreResult<DomainRecord> {
        let mut state = self.inner.write().await;
        let current = state
            .records
            .get_mut(&record.id)
            .ok_or_else(|| CoreError::DomainNotFound(record.id.to_string()))?;
        if current.revision != record.revision {
            return Err(CoreError::Conflict(format!(
                "Domain {} was modified concurrently (revision {} != {})",
                record.id, current.revision, record.revision
            )));
        }
        let mut stored = record.clone();
        stored.revision += 1;
        stored.created_at = current.created_at;
        stored.updated_at = chrono::Utc::now();
        *current = stored.clone();
        Ok(stored)
    }

    async fn delete(&self, id: DomainId) -> CoreResult<()> {
        self.inner.write().await.records.remove(&id);
        Ok(())
    }
}
