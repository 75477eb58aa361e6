//! Remote data gateway: the only code that talks to the monitoring service.
//!
//! [`DashboardApi`] is the seam every controller depends on. [`HttpGateway`]
//! is the production implementation; tests substitute scripted fakes.

#![allow(missing_docs)]

pub mod errors;
#[cfg(test)]
pub(crate) mod fake;
pub mod http;
pub mod types;

use async_trait::async_trait;

pub use errors::{GatewayError, GatewayErrorKind};
pub use http::HttpGateway;
use types::{
    Event, EventPage, EventQuery, FixPage, FixQuery, HealthReport, PurgeOutcome, QueueStats,
    RetryOutcome, ServerInfo, Stats,
};

/// Result of a single gateway operation.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// One method per remote operation. No retries, no caching.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// `GET /api/stats`
    async fn fetch_summary_stats(&self) -> GatewayResult<Stats>;

    /// `GET /api/events?page&limit&status&repo`
    async fn fetch_events(&self, query: &EventQuery) -> GatewayResult<EventPage>;

    /// `GET /api/events/:id`; unknown ids fail with a not-found error.
    async fn fetch_event(&self, id: &str) -> GatewayResult<Event>;

    /// `GET /api/fixes?page&limit`
    async fn fetch_fixes(&self, query: &FixQuery) -> GatewayResult<FixPage>;

    /// `GET /api/queue`
    async fn fetch_queue_stats(&self) -> GatewayResult<QueueStats>;

    /// `POST /api/queue/retry-failed`
    async fn retry_failed_jobs(&self) -> GatewayResult<RetryOutcome>;

    /// `POST /api/queue/clean`
    async fn purge_queue(&self) -> GatewayResult<PurgeOutcome>;

    /// `GET /webhooks/health`
    async fn fetch_health(&self) -> GatewayResult<HealthReport>;

    /// `GET /`
    async fn fetch_server_info(&self) -> GatewayResult<ServerInfo>;
}
