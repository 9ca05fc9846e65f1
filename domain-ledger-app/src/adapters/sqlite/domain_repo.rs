//! `DomainRepository` implementation for `SqliteStore`.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Set},
    ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};

use domain_ledger_core::error::{CoreError, CoreResult};
use domain_ledger_core::traits::DomainRepository;
use domain_ledger_core::types::{DomainFilter, DomainId, DomainRecord, NewDomainRecord};
use domain_ledger_core::utils::datetime;

use super::entity::domain;
use super::SqliteStore;

impl domain::Model {
    /// Convert a `SeaORM` row model into a `DomainRecord`.
    ///
    /// String-backed fields are parsed into strongly typed values.
    fn into_record(self) -> CoreResult<DomainRecord> {
        let parse_ts = |raw: &str, field: &str| {
            datetime::parse_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| CoreError::SerializationError(format!("Invalid {field}: {e}")))
        };

        Ok(DomainRecord {
            id: to_domain_id(self.id)?,
            name: self.domain,
            status: self.status.parse()?,
            verify_token: self.verify_token,
            is_public: self.is_public != 0,
            billing_data: self.billing_data,
            revision: u64::try_from(self.revision)
                .map_err(|e| CoreError::SerializationError(format!("Invalid revision: {e}")))?,
            created_at: parse_ts(&self.created_at, "created_at")?,
            updated_at: parse_ts(&self.updated_at, "updated_at")?,
        })
    }
}

fn to_domain_id(id: i64) -> CoreResult<DomainId> {
    DomainId::try_from(id).map_err(|e| CoreError::SerializationError(format!("Invalid id {id}: {e}")))
}

fn to_row_id(id: DomainId) -> CoreResult<i64> {
    i64::try_from(id).map_err(|_| CoreError::DomainNotFound(id.to_string()))
}

fn to_row_revision(revision: u64) -> CoreResult<i64> {
    i64::try_from(revision)
        .map_err(|e| CoreError::ValidationError(format!("Invalid revision {revision}: {e}")))
}

#[async_trait]
impl DomainRepository for SqliteStore {
    async fn find(&self, filter: &DomainFilter) -> CoreResult<Vec<DomainRecord>> {
        let mut query = domain::Entity::find().order_by_asc(domain::Column::Id);
        if let Some(statuses) = &filter.statuses {
            query = query.filter(domain::Column::Status.is_in(statuses.iter().map(|s| s.as_str())));
        }
        if filter.public_only {
            query = query.filter(domain::Column::IsPublic.eq(1));
        }

        let rows = query
            .all(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query domains: {e}")))?;

        rows.into_iter().map(domain::Model::into_record).collect()
    }

    async fn find_by_id(&self, id: DomainId) -> CoreResult<Option<DomainRecord>> {
        let Ok(row_id) = to_row_id(id) else {
            return Ok(None);
        };
        let row = domain::Entity::find_by_id(row_id)
            .one(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to query domain: {e}")))?;

        row.map(domain::Model::into_record).transpose()
    }

    async fn create(&self, record: NewDomainRecord) -> CoreResult<DomainRecord> {
        let now = Utc::now().to_rfc3339();
        let active = domain::ActiveModel {
            id: NotSet,
            domain: Set(record.name),
            status: Set(record.status.as_str().to_string()),
            verify_token: Set(record.verify_token),
            is_public: Set(i32::from(record.is_public)),
            billing_data: Set(record.billing_data),
            revision: Set(1),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        let model = active
            .insert(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to insert domain: {e}")))?;

        model.into_record()
    }

    async fn save(&self, record: &DomainRecord) -> CoreResult<DomainRecord> {
        let row_id = to_row_id(record.id)?;
        let revision = to_row_revision(record.revision)?;

        let changes = domain::ActiveModel {
            id: NotSet,
            domain: NotSet,
            status: Set(record.status.as_str().to_string()),
            verify_token: NotSet,
            is_public: Set(i32::from(record.is_public)),
            billing_data: Set(record.billing_data.clone()),
            revision: Set(revision + 1),
            created_at: NotSet,
            updated_at: Set(Utc::now().to_rfc3339()),
        };

        // revision 不匹配时不会更新任何行
        let result = domain::Entity::update_many()
            .set(changes)
            .filter(domain::Column::Id.eq(row_id))
            .filter(domain::Column::Revision.eq(revision))
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to update domain: {e}")))?;

        let stored = self
            .find_by_id(record.id)
            .await?
            .ok_or_else(|| CoreError::DomainNotFound(record.id.to_string()))?;

        if result.rows_affected == 0 {
            return Err(CoreError::Conflict(format!(
                "Domain {} was modified concurrently (revision {} != {})",
                record.id, stored.revision, record.revision
            )));
        }
        Ok(stored)
    }

    async fn delete(&self, id: DomainId) -> CoreResult<()> {
        let Ok(row_id) = to_row_id(id) else {
            return Ok(());
        };
        domain::Entity::delete_by_id(row_id)
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to delete domain: {e}")))?;
        Ok(())
    }
}
