//! 测试辅助模块
//!
//! 提供 mock 实现和便捷的测试工厂方法。

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::services::{DomainService, ServiceContext, DEFAULT_TOKEN_PREFIX};
use crate::traits::{
    DomainRepository, InMemoryDomainRepository, LookupError, OsRandomSource, RandomSource,
    TxtResolver,
};
use crate::types::{DomainFilter, DomainId, DomainRecord, DomainStatus, NewDomainRecord};

// ===== MockDomainRepository =====

/// In-memory store with failure injection and call counters
pub struct MockDomainRepository {
    inner: InMemoryDomainRepository,
    /// 如果 Some，save 时返回此错误
    save_error: RwLock<Option<String>>,
    /// 如果 Some，find 时返回此错误
    find_error: RwLock<Option<String>>,
    /// Ids whose saves always fail
    failing_ids: RwLock<HashSet<DomainId>>,
    /// Ids that another writer modifies right after the next read
    racing_ids: RwLock<HashSet<DomainId>>,
    finds: AtomicUsize,
    saves: AtomicUsize,
    mutations: AtomicUsize,
}

impl MockDomainRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryDomainRepository::new(),
            save_error: RwLock::new(None),
            find_error: RwLock::new(None),
            failing_ids: RwLock::new(HashSet::new()),
            racing_ids: RwLock::new(HashSet::new()),
            finds: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            mutations: AtomicUsize::new(0),
        }
    }

    pub async fn set_save_error(&self, err: Option<String>) {
        *self.save_error.write().await = err;
    }

    pub async fn set_find_error(&self, err: Option<String>) {
        *self.find_error.write().await = err;
    }

    pub async fn fail_saves_for(&self, id: DomainId) {
        self.failing_ids.write().await.insert(id);
    }

    /// Simulate a concurrent write to `id` landing between the next read and
    /// the caller's save, which then sees a stale revision.
    pub async fn race_writes_for(&self, id: DomainId) {
        self.racing_ids.write().await.insert(id);
    }

    async fn race(&self, records: &[DomainRecord]) -> CoreResult<()> {
        let mut racing = self.racing_ids.write().await;
        for record in records {
            if racing.remove(&record.id) {
                self.inner.save(record).await?;
            }
        }
        Ok(())
    }

    /// Number of `find` calls, including failed ones
    pub async fn find_count(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    /// Number of `save` calls, including failed ones
    pub async fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of successful create / save / delete calls
    pub async fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DomainRepository for MockDomainRepository {
    async fn find(&self, filter: &DomainFilter) -> CoreResult<Vec<DomainRecord>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        if let Some(ref msg) = *self.find_error.read().await {
            return Err(CoreError::StorageError(msg.clone()));
        }
        let records = self.inner.find(filter).await?;
        self.race(&records).await?;
        Ok(records)
    }

    async fn find_by_id(&self, id: DomainId) -> CoreResult<Option<DomainRecord>> {
        let record = self.inner.find_by_id(id).await?;
        self.race(record.as_slice()).await?;
        Ok(record)
    }

    async fn create(&self, record: NewDomainRecord) -> CoreResult<DomainRecord> {
        let created = self.inner.create(record).await?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn save(&self, record: &DomainRecord) -> CoreResult<DomainRecord> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if let Some(ref msg) = *self.save_error.read().await {
            return Err(CoreError::StorageError(msg.clone()));
        }
        if self.failing_ids.read().await.contains(&record.id) {
            return Err(CoreError::StorageError(format!(
                "injected failure for {}",
                record.id
            )));
        }
        let saved = self.inner.save(record).await?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(saved)
    }

    async fn delete(&self, id: DomainId) -> CoreResult<()> {
        self.inner.delete(id).await?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ===== TXT resolvers =====

/// Returns a fixed answer and counts lookups
#[derive(Clone)]
pub struct StubTxtResolver {
    answer: Result<Vec<String>, LookupError>,
    calls: Arc<AtomicUsize>,
}

impl StubTxtResolver {
    pub fn with_records(records: &[&str]) -> Self {
        Self {
            answer: Ok(records.iter().map(ToString::to_string).collect()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(error: LookupError) -> Self {
        Self {
            answer: Err(error),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TxtResolver for StubTxtResolver {
    async fn lookup_txt(&self, _name: &str) -> Result<Vec<String>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

/// Fails the test if a lookup happens at all
pub struct PanickingTxtResolver;

#[async_trait]
impl TxtResolver for PanickingTxtResolver {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, LookupError> {
        panic!("unexpected TXT lookup for {name}");
    }
}

// ===== RandomSource =====

pub struct FailingRandomSource;

impl RandomSource for FailingRandomSource {
    fn fill(&self, _buf: &mut [u8]) -> CoreResult<()> {
        Err(CoreError::RandomnessUnavailable(
            "entropy source closed".to_string(),
        ))
    }
}

// ===== 工厂方法 =====

/// Build a record without going through a store
pub fn make_record(
    id: DomainId,
    name: &str,
    status: DomainStatus,
    token: &str,
    billing: Option<&str>,
) -> DomainRecord {
    let now = Utc::now();
    DomainRecord {
        id,
        name: name.to_string(),
        status,
        verify_token: token.to_string(),
        is_public: true,
        billing_data: billing.map(ToString::to_string),
        revision: 1,
        created_at: now,
        updated_at: now,
    }
}

/// 创建测试用 `ServiceContext`
///
/// The resolver answers with no records; randomness comes from the OS.
pub fn create_test_context() -> (Arc<ServiceContext>, Arc<MockDomainRepository>) {
    let repo = Arc::new(MockDomainRepository::new());
    let resolver: Arc<dyn TxtResolver> = Arc::new(StubTxtResolver::failing(LookupError::NotFound));
    let random: Arc<dyn RandomSource> = Arc::new(OsRandomSource);
    let ctx = Arc::new(ServiceContext::new(repo.clone(), resolver, random));
    (ctx, repo)
}

/// 创建测试用 `DomainService`
pub fn create_test_domain_service() -> (DomainService, Arc<MockDomainRepository>) {
    let (ctx, repo) = create_test_context();
    (DomainService::new(ctx, DEFAULT_TOKEN_PREFIX), repo)
}
