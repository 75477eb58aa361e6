//! Work-queue counters plus the two queue mutations.
//!
//! Each mutation is guarded so it can't be re-issued while pending. A
//! successful mutation silently revalidates the mounted queue view.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use crate::gateway::types::{PurgeOutcome, QueueStats, RetryOutcome};
use crate::gateway::{DashboardApi, GatewayError, GatewayResult};
use crate::logger::jsonl::{EventType, LogEntry, Severity, SharedLog, record};
use crate::sync::{ViewHandle, ViewSource};

#[derive(Debug, Clone, Copy, Default)]
pub struct QueueView;

#[async_trait]
impl ViewSource for QueueView {
    type Params = ();
    type Data = QueueStats;

    fn name(&self) -> &'static str {
        "queue"
    }

    async fn load(&self, api: &dyn DashboardApi, _params: &()) -> GatewayResult<QueueStats> {
        api.fetch_queue_stats().await
    }

    fn fallback(&self) -> Option<QueueStats> {
        Some(QueueStats::default())
    }
}

/// Which mutation an error or log entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueAction {
    RetryFailed,
    Purge,
}

impl QueueAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RetryFailed => "retry_failed",
            Self::Purge => "purge",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueActionError {
    #[error("{} is already in progress", .0.as_str())]
    InProgress(QueueAction),

    #[error("{message}")]
    Failed {
        action: QueueAction,
        message: String,
        #[source]
        source: GatewayError,
    },
}

/// Issues queue mutations and keeps the queue view in step with them.
pub struct QueueActions {
    api: Arc<dyn DashboardApi>,
    log: Option<SharedLog>,
    retrying: AtomicBool,
    purging: AtomicBool,
}

impl QueueActions {
    #[must_use]
    pub fn new(api: Arc<dyn DashboardApi>, log: Option<SharedLog>) -> Self {
        Self {
            api,
            log,
            retrying: AtomicBool::new(false),
            purging: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn is_retrying(&self) -> bool {
        self.retrying.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_purging(&self) -> bool {
        self.purging.load(Ordering::Acquire)
    }

    /// Retry is offered only when idle and something has failed.
    #[must_use]
    pub fn can_retry(&self, stats: &QueueStats) -> bool {
        !self.is_retrying() && stats.failed > 0
    }

    /// Re-enqueue every failed job.
    ///
    /// # Errors
    /// `InProgress` while a previous retry is pending; `Failed` when the
    /// service rejects the request.
    pub async fn retry_failed(
        &self,
        view: Option<&ViewHandle<(), QueueStats>>,
    ) -> Result<RetryOutcome, QueueActionError> {
        let _guard = Pending::acquire(&self.retrying, QueueAction::RetryFailed)?;
        let result = self.api.retry_failed_jobs().await;
        self.finish(QueueAction::RetryFailed, "Failed to retry jobs", result, view)
    }

    /// Remove completed and failed jobs.
    ///
    /// # Errors
    /// `InProgress` while a previous purge is pending; `Failed` when the
    /// service rejects the request.
    pub async fn purge(
        &self,
        view: Option<&ViewHandle<(), QueueStats>>,
    ) -> Result<PurgeOutcome, QueueActionError> {
        let _guard = Pending::acquire(&self.purging, QueueAction::Purge)?;
        let result = self.api.purge_queue().await;
        self.finish(QueueAction::Purge, "Failed to clean queue", result, view)
    }

    fn finish<T>(
        &self,
        action: QueueAction,
        failure: &str,
        result: GatewayResult<T>,
        view: Option<&ViewHandle<(), QueueStats>>,
    ) -> Result<T, QueueActionError> {
        let entry = LogEntry::new(EventType::QueueAction, Severity::Info)
            .view("queue")
            .details(action.as_str());
        match result {
            Ok(outcome) => {
                record(self.log.as_ref(), &entry.outcome(true));
                if let Some(view) = view {
                    view.revalidate();
                }
                Ok(outcome)
            }
            Err(source) => {
                let mut entry = entry.error(source.code(), source.message());
                entry.severity = Severity::Warning;
                record(self.log.as_ref(), &entry);
                Err(QueueActionError::Failed {
                    action,
                    message: failure.to_owned(),
                    source,
                })
            }
        }
    }
}

/// Holds an in-progress flag for the duration of one action.
struct Pending<'a>(&'a AtomicBool);

impl<'a> Pending<'a> {
    fn acquire(flag: &'a AtomicBool, action: QueueAction) -> Result<Self, QueueActionError> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(QueueActionError::InProgress(action));
        }
        Ok(Self(flag))
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::core::config::FailurePolicy;
    use crate::gateway::fake::{self, FakeApi};
    use crate::sync::{MountOptions, mount};

    fn actions(api: &Arc<FakeApi>) -> QueueActions {
        QueueActions::new(api.clone(), None)
    }

    #[tokio::test]
    async fn retry_returns_service_message() {
        let api = FakeApi::new();
        api.reply(
            fake::RETRY,
            json!({ "message": "Retried 2 jobs", "jobIds": ["1", "2"] }),
        );
        let outcome = actions(&api).retry_failed(None).await.unwrap();
        assert_eq!(outcome.message, "Retried 2 jobs");
        assert_eq!(outcome.job_ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn purge_failure_is_reported_with_fixed_message() {
        let api = FakeApi::new();
        api.fail(fake::PURGE, GatewayError::http("/api/queue/clean", 500));
        let err = actions(&api).purge(None).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to clean queue");
        assert!(matches!(
            err,
            QueueActionError::Failed {
                action: QueueAction::Purge,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn second_retry_while_pending_is_rejected() {
        let api = FakeApi::new();
        api.reply_after(
            fake::RETRY,
            Duration::from_millis(100),
            json!({ "message": "ok", "jobIds": [] }),
        );
        let actions = actions(&api);

        let (first, second) = tokio::join!(actions.retry_failed(None), async {
            tokio::task::yield_now().await;
            assert!(actions.is_retrying());
            actions.retry_failed(None).await
        });
        assert!(first.is_ok());
        assert_eq!(
            second.unwrap_err(),
            QueueActionError::InProgress(QueueAction::RetryFailed)
        );
        assert!(!actions.is_retrying());
        assert_eq!(api.count(fake::RETRY), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn success_revalidates_the_queue_view() {
        let api = FakeApi::new();
        api.reply(fake::QUEUE, fake::queue_body(3))
            .reply(fake::QUEUE, fake::queue_body(0));
        api.reply(fake::RETRY, json!({ "message": "Retried 3 jobs" }));

        let view = mount(
            QueueView,
            api.clone(),
            (),
            MountOptions::new(Duration::from_secs(60), FailurePolicy::Error),
        );
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(view.snapshot().data.unwrap().failed, 3);

        actions(&api).retry_failed(Some(&view)).await.unwrap();
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(view.snapshot().data.unwrap().failed, 0);
        assert_eq!(api.count(fake::QUEUE), 2);
    }

    #[test]
    fn retry_needs_failed_jobs() {
        let api = FakeApi::new();
        let actions = actions(&api);
        assert!(!actions.can_retry(&QueueStats::default()));
        let stats = QueueStats {
            failed: 2,
            ..QueueStats::default()
        };
        assert!(actions.can_retry(&stats));
    }
}
