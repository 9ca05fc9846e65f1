//! Background reconciliation loop

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::reconciliation::ReconciliationService;

/// Shortest accepted interval; `tokio::time::interval_at` rejects a zero period
pub const MIN_RECONCILE_INTERVAL: Duration = Duration::from_secs(1);

/// Runs [`ReconciliationService::run_once`] on a fixed interval.
///
/// Runs never overlap: a slow run delays the next tick instead of stacking.
pub struct ReconciliationScheduler {
    service: Arc<ReconciliationService>,
    interval: Duration,
    run_on_start: bool,
}

impl ReconciliationScheduler {
    /// Intervals below [`MIN_RECONCILE_INTERVAL`] are raised to it.
    #[must_use]
    pub fn new(service: Arc<ReconciliationService>, interval: Duration) -> Self {
        if interval < MIN_RECONCILE_INTERVAL {
            log::warn!(
                "Reconciliation interval {interval:?} too short, using {MIN_RECONCILE_INTERVAL:?}"
            );
        }
        Self {
            service,
            interval: interval.max(MIN_RECONCILE_INTERVAL),
            run_on_start: true,
        }
    }

    /// Whether the first run happens immediately or after one interval.
    #[must_use]
    pub fn run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    /// Spawn the loop on the current tokio runtime.
    #[must_use]
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let start = if self.run_on_start {
                tokio::time::Instant::now()
            } else {
                tokio::time::Instant::now() + self.interval
            };
            let mut ticker = tokio::time::interval_at(start, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            log::info!(
                "Reconciliation scheduler started (every {}s)",
                self.interval.as_secs()
            );
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.service.run_once(Utc::now()).await {
                            log::error!("Scheduled reconciliation failed: {e}");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            log::info!("Reconciliation scheduler stopped");
        });
        SchedulerHandle { shutdown, task }
    }
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop, waiting for an in-flight run to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            log::error!("Reconciliation scheduler task failed: {e}");
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
