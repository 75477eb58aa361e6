//! Per-view instantiations of the poll-and-refresh controller.
//!
//! [`Views`] mounts each view with its configured interval, failure policy,
//! and page size. Query-driven views (events, fixes) follow a
//! [`QueryState`] channel from a [`crate::query::sync::QuerySync`].

#![allow(missing_docs)]

pub mod dashboard;
pub mod event_detail;
pub mod events;
pub mod fixes;
pub mod queue;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

pub use dashboard::DashboardView;
pub use event_detail::EventDetailView;
pub use events::EventsView;
pub use fixes::{FixesParams, FixesView};
pub use queue::{QueueAction, QueueActionError, QueueActions, QueueView};

use crate::core::config::PollingConfig;
use crate::gateway::DashboardApi;
use crate::gateway::types::{Event, EventPage, EventQuery, FixPage, QueueStats, Stats};
use crate::health::HealthMonitor;
use crate::logger::jsonl::SharedLog;
use crate::query::QueryState;
use crate::sync::{MountOptions, ViewHandle, mount, mount_with_query};

/// Mounts views against one gateway with shared polling settings.
///
/// Mount methods must be called from within a tokio runtime.
#[derive(Clone)]
pub struct Views {
    api: Arc<dyn DashboardApi>,
    polling: PollingConfig,
    log: Option<SharedLog>,
}

impl Views {
    #[must_use]
    pub fn new(api: Arc<dyn DashboardApi>, polling: PollingConfig, log: Option<SharedLog>) -> Self {
        Self { api, polling, log }
    }

    #[must_use]
    pub fn api(&self) -> Arc<dyn DashboardApi> {
        Arc::clone(&self.api)
    }

    fn options(&self, interval: Duration) -> MountOptions {
        MountOptions::new(interval, self.polling.failure_policy)
            .with_log(self.log.clone())
    }

    #[must_use]
    pub fn dashboard(&self) -> ViewHandle<(), Stats> {
        mount(
            DashboardView,
            self.api(),
            (),
            self.options(self.polling.dashboard()),
        )
    }

    #[must_use]
    pub fn events(&self, query: watch::Receiver<QueryState>) -> ViewHandle<EventQuery, EventPage> {
        mount_with_query(
            EventsView::new(self.polling.page_size),
            self.api(),
            query,
            self.options(self.polling.events()),
        )
    }

    #[must_use]
    pub fn fixes(&self, query: watch::Receiver<QueryState>) -> ViewHandle<FixesParams, FixPage> {
        mount_with_query(
            FixesView::new(self.polling.page_size),
            self.api(),
            query,
            self.options(self.polling.fixes()),
        )
    }

    #[must_use]
    pub fn queue(&self) -> ViewHandle<(), QueueStats> {
        mount(
            QueueView,
            self.api(),
            (),
            self.options(self.polling.queue()),
        )
    }

    #[must_use]
    pub fn event_detail(&self, id: impl Into<String>) -> ViewHandle<String, Event> {
        mount(
            EventDetailView,
            self.api(),
            id.into(),
            self.options(self.polling.event_detail()),
        )
    }

    #[must_use]
    pub fn health(&self) -> HealthMonitor {
        HealthMonitor::mount(self.api(), self.polling.health(), self.log.clone())
    }

    #[must_use]
    pub fn queue_actions(&self) -> QueueActions {
        QueueActions::new(self.api(), self.log.clone())
    }
}
