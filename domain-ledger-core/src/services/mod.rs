//! 业务逻辑服务层

mod domain_service;
mod lifecycle;
mod reconciliation;
mod scheduler;
mod token;
mod verification;

pub use domain_service::DomainService;
pub use lifecycle::{Evaluation, LifecycleAction, LifecycleEngine, LifecycleWarning};
pub use reconciliation::{
    ReconciliationReport, ReconciliationService, RecordOutcome, RecordReport,
    DEFAULT_RECONCILE_CONCURRENCY,
};
pub use scheduler::{ReconciliationScheduler, SchedulerHandle, MIN_RECONCILE_INTERVAL};
pub use token::{TokenGenerator, DEFAULT_TOKEN_PREFIX, TOKEN_ENTROPY_BYTES};
pub use verification::{DomainVerifier, VerificationOutcome};

use std::sync::Arc;

use crate::traits::{DomainRepository, RandomSource, TxtResolver};

/// 服务上下文 - 持有所有依赖
///
/// 平台层需要创建此上下文，并注入平台特定的存储实现。
pub struct ServiceContext {
    /// Domain record store
    pub domain_repository: Arc<dyn DomainRepository>,
    /// DNS TXT lookup
    pub txt_resolver: Arc<dyn TxtResolver>,
    /// Randomness for verification tokens
    pub random_source: Arc<dyn RandomSource>,
}

impl ServiceContext {
    /// 创建服务上下文
    #[must_use]
    pub fn new(
        domain_repository: Arc<dyn DomainRepository>,
        txt_resolver: Arc<dyn TxtResolver>,
        random_source: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            domain_repository,
            txt_resolver,
            random_source,
        }
    }

    #[must_use]
    pub fn domain_repository(&self) -> &Arc<dyn DomainRepository> {
        &self.domain_repository
    }

    #[must_use]
    pub fn txt_resolver(&self) -> &Arc<dyn TxtResolver> {
        &self.txt_resolver
    }

    #[must_use]
    pub fn random_source(&self) -> &Arc<dyn RandomSource> {
        &self.random_source
    }
}
