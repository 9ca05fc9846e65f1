//! Periodic reconciliation of verified domains
//!
//! Every run loads the verified records, evaluates each with the
//! [`LifecycleEngine`] and persists renewals and expirations. A failure on one
//! record is logged and reported but never aborts the rest of the batch.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::CoreResult;
use crate::traits::DomainRepository;
use crate::types::{DomainFilter, DomainId, DomainRecord, DomainStatus};
use crate::utils::datetime;

use super::lifecycle::{LifecycleAction, LifecycleEngine};

/// Records processed concurrently when no limit is configured
pub const DEFAULT_RECONCILE_CONCURRENCY: usize = 4;

/// What happened to a single record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RecordOutcome {
    Renewed {
        #[serde(rename = "newEndDate")]
        new_end_date: String,
    },
    Expired,
    NoAction,
    /// Record could not be evaluated (malformed billing payload)
    Skipped { reason: String },
    /// Record was evaluated but persisting the change failed
    Failed { error: String },
}

/// Per-record report line
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReport {
    pub id: DomainId,
    pub domain: String,
    #[serde(flatten)]
    pub outcome: RecordOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Summary of one reconciliation run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    #[serde(with = "crate::utils::datetime")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "crate::utils::datetime")]
    pub finished_at: DateTime<Utc>,
    pub records: Vec<RecordReport>,
}

impl ReconciliationReport {
    fn count(&self, pred: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }

    #[must_use]
    pub fn renewed(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Renewed { .. }))
    }

    #[must_use]
    pub fn expired(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Expired))
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Skipped { .. }))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Failed { .. }))
    }

    #[must_use]
    pub fn warnings(&self) -> usize {
        self.records.iter().filter(|r| r.warning.is_some()).count()
    }

    /// Report line for `id`, if it was part of the run
    #[must_use]
    pub fn get(&self, id: DomainId) -> Option<&RecordReport> {
        self.records.iter().find(|r| r.id == id)
    }
}

/// Drives the lifecycle engine over all verified records.
pub struct ReconciliationService {
    repository: Arc<dyn DomainRepository>,
    concurrency: usize,
}

impl ReconciliationService {
    #[must_use]
    pub fn new(repository: Arc<dyn DomainRepository>) -> Self {
        Self {
            repository,
            concurrency: DEFAULT_RECONCILE_CONCURRENCY,
        }
    }

    /// Set the number of records processed at once (minimum 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run a single reconciliation pass at `now`.
    ///
    /// # Errors
    /// Only if the verified records cannot be loaded. Per-record failures are
    /// reported in the returned [`ReconciliationReport`].
    pub async fn run_once(&self, now: DateTime<Utc>) -> CoreResult<ReconciliationReport> {
        let started_at = Utc::now();
        log::info!("Domain reconciliation started");

        let records = self
            .repository
            .find(&DomainFilter::with_status(DomainStatus::Verified))
            .await
            .inspect_err(|e| log::error!("Domain reconciliation aborted: {e}"))?;

        let mut reports: Vec<RecordReport> = stream::iter(records)
            .map(|record| self.process_record(record, now))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        reports.sort_by_key(|r| r.id);

        let report = ReconciliationReport {
            started_at,
            finished_at: Utc::now(),
            records: reports,
        };
        log::info!(
            "Domain reconciliation finished: {} checked, {} renewed, {} expired, {} skipped, {} failed",
            report.records.len(),
            report.renewed(),
            report.expired(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    async fn process_record(&self, record: DomainRecord, now: DateTime<Utc>) -> RecordReport {
        let id = record.id;
        let domain = record.name.clone();
        let report = |outcome, warning| RecordReport {
            id,
            domain: domain.clone(),
            outcome,
            warning,
        };

        let (_, evaluation) = match LifecycleEngine::evaluate_record(&record, now) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Skipping domain {domain} ({id}): {e}");
                return report(
                    RecordOutcome::Skipped {
                        reason: e.to_string(),
                    },
                    None,
                );
            }
        };

        let warning = evaluation.warning.as_ref().map(|w| {
            log::warn!("Domain {domain} ({id}): {w}");
            w.to_string()
        });

        let updated = match LifecycleEngine::apply(&record, &evaluation.action) {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                log::info!("Domain {domain} ({id}): no action");
                return report(RecordOutcome::NoAction, warning);
            }
            Err(e) => {
                log::error!("Failed to apply lifecycle action to {domain} ({id}): {e}");
                return report(
                    RecordOutcome::Failed {
                        error: e.to_string(),
                    },
                    warning,
                );
            }
        };

        if let Err(e) = self.repository.save(&updated).await {
            log::error!("Failed to save domain {domain} ({id}): {e}");
            return report(
                RecordOutcome::Failed {
                    error: e.to_string(),
                },
                warning,
            );
        }

        let outcome = match evaluation.action {
            LifecycleAction::Renew { new_end_date } => renewed(&domain, id, &new_end_date),
            LifecycleAction::Expire => {
                log::info!("Domain {domain} ({id}) expired");
                RecordOutcome::Expired
            }
            LifecycleAction::NoAction => RecordOutcome::NoAction,
        };
        report(outcome, warning)
    }
}

fn renewed(domain: &str, id: DomainId, new_end_date: &DateTime<FixedOffset>) -> RecordOutcome {
    let new_end_date = datetime::format_rfc3339(new_end_date);
    log::info!("Domain {domain} ({id}) renewed until {new_end_date}");
    RecordOutcome::Renewed { new_end_date }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockDomainRepository;
    use crate::types::{BillingData, NewDomainRecord};
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use std::sync::Mutex;

    /// Collects formatted log lines from every test in this binary
    struct CapturedLogs(Mutex<Vec<String>>);

    impl log::Log for CapturedLogs {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static LOGS: CapturedLogs = CapturedLogs(Mutex::new(Vec::new()));

    fn capture_logs() {
        let _ = log::set_logger(&LOGS);
        log::set_max_level(log::LevelFilter::Info);
    }

    fn logged_lines_mentioning(needle: &str) -> Vec<String> {
        LOGS.0
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.contains(needle))
            .cloned()
            .collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn overdue() -> String {
        datetime::format_rfc3339(&(now() - Duration::days(1)).fixed_offset())
    }

    async fn seed(
        repo: &MockDomainRepository,
        name: &str,
        status: DomainStatus,
        billing: Option<String>,
    ) -> DomainRecord {
        repo.create(NewDomainRecord {
            status,
            billing_data: billing,
            ..NewDomainRecord::pending(name.to_string(), "tok".to_string())
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn mixed_batch_is_processed_independently() {
        let repo = Arc::new(MockDomainRepository::new());
        let malformed = seed(
            &repo,
            "broken.com",
            DomainStatus::Verified,
            Some("{not json".into()),
        )
        .await;
        let renewable = seed(
            &repo,
            "renew.com",
            DomainStatus::Verified,
            Some(json!({ "endDate": overdue(), "autoRenewal": "1", "cycle": "yearly" }).to_string()),
        )
        .await;
        let expiring = seed(
            &repo,
            "lapse.com",
            DomainStatus::Verified,
            Some(json!({ "endDate": overdue(), "autoRenewal": "0" }).to_string()),
        )
        .await;

        let service = ReconciliationService::new(repo.clone());
        let report = service.run_once(now()).await.unwrap();

        assert_eq!(report.records.len(), 3);
        assert!(matches!(
            report.get(malformed.id).unwrap().outcome,
            RecordOutcome::Skipped { .. }
        ));
        assert_eq!(report.renewed(), 1);
        assert_eq!(report.expired(), 1);

        let stored = repo.find_by_id(renewable.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DomainStatus::Verified);
        let billing = BillingData::decode(stored.billing_data.as_deref().unwrap())
            .unwrap()
            .unwrap();
        assert!(billing.parsed_end_date().unwrap().unwrap() > now());

        let stored = repo.find_by_id(expiring.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DomainStatus::Expired);
        assert_eq!(stored.billing_data, expiring.billing_data);

        let stored = repo.find_by_id(malformed.id).await.unwrap().unwrap();
        assert_eq!(stored, malformed);
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let repo = Arc::new(MockDomainRepository::new());
        seed(
            &repo,
            "renew.com",
            DomainStatus::Verified,
            Some(json!({ "endDate": overdue(), "autoRenewal": true, "cycle": "monthly" }).to_string()),
        )
        .await;
        let service = ReconciliationService::new(repo.clone());
        assert_eq!(service.run_once(now()).await.unwrap().renewed(), 1);

        let report = service.run_once(now()).await.unwrap();
        assert_eq!(report.renewed(), 0);
        assert_eq!(report.records[0].outcome, RecordOutcome::NoAction);
    }

    #[tokio::test]
    async fn save_failure_does_not_stop_the_batch() {
        let repo = Arc::new(MockDomainRepository::new());
        let billing = json!({ "endDate": overdue(), "autoRenewal": "0" }).to_string();
        let failing = seed(&repo, "a.com", DomainStatus::Verified, Some(billing.clone())).await;
        let healthy = seed(&repo, "b.com", DomainStatus::Verified, Some(billing)).await;
        repo.fail_saves_for(failing.id).await;

        let service = ReconciliationService::new(repo.clone()).with_concurrency(1);
        let report = service.run_once(now()).await.unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(report.expired(), 1);
        assert!(matches!(
            report.get(failing.id).unwrap().outcome,
            RecordOutcome::Failed { .. }
        ));
        assert_eq!(
            repo.find_by_id(healthy.id).await.unwrap().unwrap().status,
            DomainStatus::Expired
        );
        assert_eq!(
            repo.find_by_id(failing.id).await.unwrap().unwrap().status,
            DomainStatus::Verified
        );
    }

    #[tokio::test]
    async fn concurrent_write_fails_only_that_record() {
        let repo = Arc::new(MockDomainRepository::new());
        let billing = json!({ "endDate": overdue(), "autoRenewal": "0" }).to_string();
        let raced = seed(&repo, "raced.com", DomainStatus::Verified, Some(billing.clone())).await;
        let calm = seed(&repo, "calm.com", DomainStatus::Verified, Some(billing)).await;
        repo.race_writes_for(raced.id).await;

        let report = ReconciliationService::new(repo.clone())
            .run_once(now())
            .await
            .unwrap();

        match &report.get(raced.id).unwrap().outcome {
            RecordOutcome::Failed { error } => {
                assert!(error.contains("modified concurrently"), "{error}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(report.get(calm.id).unwrap().outcome, RecordOutcome::Expired);
        assert_eq!(
            repo.find_by_id(raced.id).await.unwrap().unwrap().status,
            DomainStatus::Verified
        );

        // the next interval picks it up again
        let retry = ReconciliationService::new(repo.clone())
            .run_once(now())
            .await
            .unwrap();
        assert_eq!(retry.get(raced.id).unwrap().outcome, RecordOutcome::Expired);
    }

    #[tokio::test]
    async fn renewal_preserves_the_stored_payload() {
        let repo = Arc::new(MockDomainRepository::new());
        let record = seed(
            &repo,
            "keep.com",
            DomainStatus::Verified,
            Some(
                json!({
                    "endDate": "2025-06-14T00:00:00Z",
                    "autoRenewal": "1",
                    "cycle": "yearly",
                    "notes": null,
                })
                .to_string(),
            ),
        )
        .await;

        let report = ReconciliationService::new(repo.clone())
            .run_once(now())
            .await
            .unwrap();
        assert_eq!(report.renewed(), 1);

        let stored = repo.find_by_id(record.id).await.unwrap().unwrap();
        let stored: serde_json::Value =
            serde_json::from_str(stored.billing_data.as_deref().unwrap()).unwrap();
        assert_eq!(
            stored,
            json!({
                "endDate": "2026-06-14T00:00:00Z",
                "autoRenewal": "1",
                "cycle": "yearly",
                "notes": null,
            })
        );
    }

    #[tokio::test]
    async fn every_outcome_is_logged() {
        capture_logs();
        let repo = Arc::new(MockDomainRepository::new());
        let tomorrow = datetime::format_rfc3339(&(now() + Duration::days(1)).fixed_offset());
        seed(
            &repo,
            "not-due-yet.com",
            DomainStatus::Verified,
            Some(json!({ "endDate": tomorrow, "autoRenewal": "0" }).to_string()),
        )
        .await;
        seed(&repo, "no-billing.com", DomainStatus::Verified, None).await;
        seed(
            &repo,
            "renew-logged.com",
            DomainStatus::Verified,
            Some(json!({ "endDate": overdue(), "autoRenewal": "1", "cycle": "yearly" }).to_string()),
        )
        .await;

        ReconciliationService::new(repo).run_once(now()).await.unwrap();

        assert_eq!(
            logged_lines_mentioning("not-due-yet.com"),
            vec!["Domain not-due-yet.com (1): no action".to_string()]
        );
        assert_eq!(logged_lines_mentioning("no-billing.com").len(), 1);
        assert!(logged_lines_mentioning("renew-logged.com")[0].contains("renewed until"));
    }

    #[tokio::test]
    async fn records_without_billing_and_other_statuses_are_untouched() {
        let repo = Arc::new(MockDomainRepository::new());
        let exempt = seed(&repo, "free.com", DomainStatus::Verified, None).await;
        let pending = seed(
            &repo,
            "pending.com",
            DomainStatus::Pending,
            Some(json!({ "endDate": overdue(), "autoRenewal": "0" }).to_string()),
        )
        .await;

        let report = ReconciliationService::new(repo.clone())
            .run_once(now())
            .await
            .unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.get(exempt.id).unwrap().outcome, RecordOutcome::NoAction);
        assert!(report.get(pending.id).is_none());
        assert_eq!(repo.save_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_cycle_is_reported_as_warning() {
        let repo = Arc::new(MockDomainRepository::new());
        let record = seed(
            &repo,
            "odd.com",
            DomainStatus::Verified,
            Some(json!({ "endDate": overdue(), "autoRenewal": "1", "cycle": "weekly" }).to_string()),
        )
        .await;

        let report = ReconciliationService::new(repo.clone())
            .run_once(now())
            .await
            .unwrap();

        let line = report.get(record.id).unwrap();
        assert_eq!(line.outcome, RecordOutcome::NoAction);
        assert!(line.warning.as_deref().unwrap().contains("weekly"));
        assert_eq!(report.warnings(), 1);
    }

    #[tokio::test]
    async fn load_failure_aborts_the_run() {
        let repo = Arc::new(MockDomainRepository::new());
        repo.set_find_error(Some("database locked".into())).await;
        assert!(ReconciliationService::new(repo)
            .run_once(now())
            .await
            .is_err());
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let line = RecordReport {
            id: 1,
            domain: "a.com".into(),
            outcome: RecordOutcome::Renewed {
                new_end_date: "2026-01-01T00:00:00Z".into(),
            },
            warning: None,
        };
        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["outcome"], "renewed");
        assert_eq!(value["newEndDate"], "2026-01-01T00:00:00Z");
        assert!(value.get("warning").is_none());
    }
}
