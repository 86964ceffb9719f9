//! Scheduled jobs for the workflow safety nets.
//!
//! Two loops run for the lifetime of the server: one retries notification
//! outbox rows whose next attempt is due, the other materializes memberships
//! for approved join requests that are missing one.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use matchup_common::Config;
use matchup_core::services::{MembershipService, NotificationService};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Scheduled job types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledJob {
    /// Redeliver notification outbox rows that are due.
    RetryNotifications,
    /// Materialize memberships for approved requests that lack one.
    ReconcileMemberships,
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval for notification retries (default: 30 seconds).
    pub notification_retry_interval: Duration,
    /// Outbox rows handled per run.
    pub notification_batch_size: u64,
    /// Interval for membership reconciliation (default: 5 minutes).
    pub reconcile_interval: Duration,
    /// Approved requests inspected per run.
    pub reconcile_batch_size: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            notification_retry_interval: Duration::from_secs(30),
            notification_batch_size: 100,
            reconcile_interval: Duration::from_secs(300),
            reconcile_batch_size: 200,
        }
    }
}

impl From<&Config> for SchedulerConfig {
    fn from(config: &Config) -> Self {
        Self {
            notification_retry_interval: Duration::from_secs(
                config.notifications.sweep_interval_secs.max(1),
            ),
            notification_batch_size: config.notifications.batch_size,
            reconcile_interval: Duration::from_secs(config.reconcile.interval_secs.max(1)),
            reconcile_batch_size: config.reconcile.batch_size,
        }
    }
}

/// Job executor trait for scheduled jobs.
#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    /// Retry due notification deliveries. Returns rows delivered.
    async fn retry_notifications(
        &self,
        batch_size: u64,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>>;

    /// Repair approved requests without membership. Returns rows repaired.
    async fn reconcile_memberships(
        &self,
        batch_size: u64,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>>;
}

/// Executor backed by the core services.
#[derive(Clone)]
pub struct WorkflowJobExecutor {
    notification_service: NotificationService,
    membership_service: MembershipService,
}

impl WorkflowJobExecutor {
    /// Create a new executor.
    #[must_use]
    pub const fn new(
        notification_service: NotificationService,
        membership_service: MembershipService,
    ) -> Self {
        Self {
            notification_service,
            membership_service,
        }
    }
}

#[async_trait::async_trait]
impl JobExecutor for WorkflowJobExecutor {
    async fn retry_notifications(
        &self,
        batch_size: u64,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let report = self.notification_service.retry_due(batch_size).await?;
        if report.abandoned > 0 {
            tracing::warn!(abandoned = report.abandoned, "Notifications abandoned this run");
        }
        Ok(report.delivered as u64)
    }

    async fn reconcile_memberships(
        &self,
        batch_size: u64,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let repaired = self
            .membership_service
            .reconcile_approved(batch_size)
            .await?;
        Ok(repaired as u64)
    }
}

/// Run the scheduler with the given configuration and executor.
///
/// Returns the spawned loops so the caller can abort them on shutdown.
pub fn run_scheduler<E: JobExecutor + 'static>(
    config: SchedulerConfig,
    executor: Arc<E>,
) -> Vec<JoinHandle<()>> {
    let executor_retry = executor.clone();
    let executor_reconcile = executor;

    let retry_interval = config.notification_retry_interval;
    let retry_batch = config.notification_batch_size;
    let reconcile_interval = config.reconcile_interval;
    let reconcile_batch = config.reconcile_batch_size;

    // Spawn notification retry task
    let retry = tokio::spawn(async move {
        let mut interval = interval(retry_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match executor_retry.retry_notifications(retry_batch).await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(count, "Redelivered notifications");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to retry notifications");
                }
            }
        }
    });

    // Spawn membership reconciliation task
    let reconcile = tokio::spawn(async move {
        let mut interval = interval(reconcile_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match executor_reconcile.reconcile_memberships(reconcile_batch).await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(count, "Reconciled missing memberships");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to reconcile memberships");
                }
            }
        }
    });

    tracing::info!(
        ?retry_interval,
        ?reconcile_interval,
        "Scheduler started"
    );

    vec![retry, reconcile]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct CountingExecutor {
        retries: AtomicU64,
        reconciles: AtomicU64,
    }

    #[async_trait::async_trait]
    impl JobExecutor for CountingExecutor {
        async fn retry_notifications(
            &self,
            _batch_size: u64,
        ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
            self.retries.fetch_add(1, Ordering::SeqCst);
            Err("redis down".into())
        }

        async fn reconcile_memberships(
            &self,
            _batch_size: u64,
        ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
            self.reconciles.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.notification_retry_interval, Duration::from_secs(30));
        assert_eq!(config.reconcile_interval, Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_job_keeps_looping() {
        let executor = Arc::new(CountingExecutor::default());
        let config = SchedulerConfig {
            notification_retry_interval: Duration::from_secs(10),
            notification_batch_size: 10,
            reconcile_interval: Duration::from_secs(60),
            reconcile_batch_size: 10,
        };

        let handles = run_scheduler(config, executor.clone());
        tokio::time::sleep(Duration::from_secs(35)).await;

        assert!(executor.retries.load(Ordering::SeqCst) >= 3);
        assert_eq!(executor.reconciles.load(Ordering::SeqCst), 1);

        for handle in handles {
            handle.abort();
        }
    }
}
