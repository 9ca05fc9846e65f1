//! Application bootstrap for Domain Ledger.
//!
//! Provides `AppState` (service container), `AppStateBuilder` (adapter
//! injection), `AppConfig` and the storage / DNS adapters.

pub mod adapters;
pub mod config;

use std::sync::Arc;

use domain_ledger_core::error::{CoreError, CoreResult};
use domain_ledger_core::services::{
    DomainService, ReconciliationScheduler, ReconciliationService, SchedulerHandle,
    ServiceContext,
};
use domain_ledger_core::traits::{DomainRepository, OsRandomSource, RandomSource, TxtResolver};

use adapters::HickoryTxtResolver;
pub use config::AppConfig;

/// Application state.
///
/// Holds the services and the `ServiceContext`. The front end constructs this
/// once at startup via `AppStateBuilder`.
pub struct AppState {
    /// Service context (holds all adapters)
    pub ctx: Arc<ServiceContext>,
    /// Domain service
    pub domain_service: DomainService,
    /// Lifecycle reconciliation
    pub reconciliation_service: Arc<ReconciliationService>,
    /// Effective configuration
    pub config: AppConfig,
}

impl AppState {
    /// Open the `SQLite` store named in `config` and wire the default adapters.
    ///
    /// # Errors
    /// Returns `CoreError::StorageError` if the database cannot be opened.
    #[cfg(feature = "sqlite-store")]
    pub async fn open(config: AppConfig) -> CoreResult<Self> {
        let store = adapters::SqliteStore::new(&config.database.path).await?;
        AppStateBuilder::new()
            .config(config)
            .domain_repository(Arc::new(store))
            .build()
    }

    /// Spawn the reconciliation scheduler, unless disabled in the config.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start_scheduler(&self) -> Option<SchedulerHandle> {
        let settings = &self.config.reconciliation;
        if !settings.enabled {
            log::info!("Reconciliation scheduler disabled by configuration");
            return None;
        }
        Some(
            ReconciliationScheduler::new(
                Arc::clone(&self.reconciliation_service),
                settings.interval(),
            )
            .spawn(),
        )
    }
}

/// Builder for constructing `AppState` with platform-specific adapters.
///
/// # Required adapters
/// - `domain_repository` — where domain records are stored
///
/// # Optional
/// - `txt_resolver` — defaults to `HickoryTxtResolver` configured from `[verification]`
/// - `random_source` — defaults to `OsRandomSource`
/// - `config` — defaults to `AppConfig::default()`
pub struct AppStateBuilder {
    config: AppConfig,
    domain_repository: Option<Arc<dyn DomainRepository>>,
    txt_resolver: Option<Arc<dyn TxtResolver>>,
    random_source: Option<Arc<dyn RandomSource>>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            domain_repository: None,
            txt_resolver: None,
            random_source: None,
        }
    }

    #[must_use]
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn domain_repository(mut self, repo: Arc<dyn DomainRepository>) -> Self {
        self.domain_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn txt_resolver(mut self, resolver: Arc<dyn TxtResolver>) -> Self {
        self.txt_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn random_source(mut self, source: Arc<dyn RandomSource>) -> Self {
        self.random_source = Some(source);
        self
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if required adapters are missing,
    /// `CoreError::ConfigError` if the configuration is invalid.
    pub fn build(self) -> CoreResult<AppState> {
        self.config.validate()?;

        let domain_repository = self.domain_repository.ok_or_else(|| {
            CoreError::ValidationError("domain_repository is required".to_string())
        })?;
        let txt_resolver = self.txt_resolver.unwrap_or_else(|| {
            Arc::new(HickoryTxtResolver::new(
                &self.config.verification.resolver_settings(),
            ))
        });
        let random_source = self
            .random_source
            .unwrap_or_else(|| Arc::new(OsRandomSource));

        let ctx = Arc::new(ServiceContext::new(
            Arc::clone(&domain_repository),
            txt_resolver,
            random_source,
        ));

        let domain_service = DomainService::new(
            Arc::clone(&ctx),
            self.config.verification.token_prefix.clone(),
        );
        let reconciliation_service = Arc::new(
            ReconciliationService::new(domain_repository)
                .with_concurrency(self.config.reconciliation.concurrency),
        );

        Ok(AppState {
            ctx,
            domain_service,
            reconciliation_service,
            config: self.config,
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
