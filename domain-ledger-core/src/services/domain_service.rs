//! 域名管理服务

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::services::{DomainVerifier, ServiceContext, TokenGenerator, VerificationOutcome};
use crate::types::{
    normalize_domain_name, parse_domain_id, BillingData, DomainFilter, DomainId, DomainRecord,
    DomainStatus, DomainView, ListScope, NewDomainRecord, VerifyResult,
};

/// Entry point for callers: create, list, update, verify and delete domains.
pub struct DomainService {
    ctx: Arc<ServiceContext>,
    tokens: TokenGenerator,
    verifier: DomainVerifier,
}

impl DomainService {
    /// 创建域名服务实例
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, token_prefix: impl Into<String>) -> Self {
        let tokens = TokenGenerator::new(ctx.random_source().clone(), token_prefix);
        let verifier = DomainVerifier::new(ctx.txt_resolver().clone());
        Self {
            ctx,
            tokens,
            verifier,
        }
    }

    /// Register a domain. It starts pending, public and without billing data.
    ///
    /// # Errors
    /// * `ValidationError` - empty or malformed name
    /// * `RandomnessUnavailable` - no token could be minted; nothing is stored
    pub async fn create_domain(&self, name: &str) -> CoreResult<DomainRecord> {
        let name = normalize_domain_name(name)?;
        let token = self.tokens.generate().inspect_err(|e| {
            log::error!("Failed to generate verification token for {name}: {e}");
        })?;

        let record = self
            .ctx
            .domain_repository()
            .create(NewDomainRecord::pending(name, token))
            .await?;
        log::info!("Domain {} ({}) added, pending verification", record.name, record.id);
        Ok(record)
    }

    /// 列出域名
    pub async fn list_domains(&self, scope: ListScope) -> CoreResult<Vec<DomainRecord>> {
        self.ctx
            .domain_repository()
            .find(&DomainFilter::for_scope(scope))
            .await
    }

    /// List domains shaped for output, with `expires_in_days` computed at `now`.
    pub async fn list_domain_views(
        &self,
        scope: ListScope,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<DomainView>> {
        Ok(self
            .list_domains(scope)
            .await?
            .into_iter()
            .map(|record| DomainView::from_record(record, scope, now))
            .collect())
    }

    /// # Errors
    /// `ValidationError` for a malformed id, `DomainNotFound` for an unknown one.
    pub async fn get_domain(&self, id: &str) -> CoreResult<DomainRecord> {
        let id = parse_domain_id(id)?;
        self.load(id).await
    }

    /// Replace the visibility flag and billing payload.
    ///
    /// Both fields are overwritten: `None` or JSON `null` clears the billing data.
    /// A payload the codec cannot read is still stored; reconciliation skips it.
    ///
    /// # Errors
    /// `ValidationError`, `DomainNotFound`, or `Conflict` if the record changed concurrently.
    pub async fn update_domain(
        &self,
        id: &str,
        is_public: bool,
        billing: Option<Value>,
    ) -> CoreResult<DomainRecord> {
        let id = parse_domain_id(id)?;
        let billing_data = match billing {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::to_string(&value)
                    .map_err(|e| CoreError::SerializationError(e.to_string()))?,
            ),
        };

        if let Some(raw) = billing_data.as_deref() {
            if let Err(e) = BillingData::decode(raw) {
                log::warn!("Domain {id}: storing billing data that cannot be decoded ({e})");
            }
        }

        let mut record = self.load(id).await?;
        record.is_public = is_public;
        record.billing_data = billing_data;
        let saved = self
            .ctx
            .domain_repository()
            .save(&record)
            .await
            .inspect_err(|e| log_failure("update", id, e))?;
        log::info!("Domain {} ({id}) updated", saved.name);
        Ok(saved)
    }

    /// Check the domain's TXT records and mark it verified on a match.
    ///
    /// A missing token is a negative result, not an error.
    ///
    /// # Errors
    /// `ValidationError`, `DomainNotFound`, `LookupTransient` when DNS could not
    /// answer, or a storage error while persisting the new status.
    pub async fn verify_domain(&self, id: &str) -> CoreResult<VerifyResult> {
        let id = parse_domain_id(id)?;
        let mut record = self.load(id).await?;

        let outcome = self
            .verifier
            .check(&record)
            .await
            .inspect_err(|e| log_failure("verify", id, e))?;

        if outcome == VerificationOutcome::Matched {
            let previous = record.status;
            record.status = DomainStatus::Verified;
            self.ctx
                .domain_repository()
                .save(&record)
                .await
                .inspect_err(|e| log_failure("verify", id, e))?;
            log::info!("Domain {} ({id}) verified (was {previous})", record.name);
        }

        Ok(VerifyResult {
            success: outcome.is_verified(),
            message: outcome.message().to_string(),
        })
    }

    /// Remove a domain. A malformed id is treated as nothing to delete.
    pub async fn delete_domain(&self, id: &str) -> CoreResult<()> {
        let Ok(id) = parse_domain_id(id) else {
            log::debug!("Ignoring delete for malformed domain id '{id}'");
            return Ok(());
        };
        self.ctx.domain_repository().delete(id).await?;
        log::info!("Domain {id} deleted");
        Ok(())
    }

    async fn load(&self, id: DomainId) -> CoreResult<DomainRecord> {
        self.ctx
            .domain_repository()
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::DomainNotFound(id.to_string()))
    }
}

fn log_failure(op: &str, id: DomainId, e: &CoreError) {
    if e.is_expected() {
        log::warn!("Domain {op} for {id} failed: {e}");
    } else {
        log::error!("Domain {op} for {id} failed: {e}");
    }
}
