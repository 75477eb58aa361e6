//! Scripted in-process [`DashboardApi`] for controller and view tests.
//!
//! Replies are queued per endpoint. The last queued reply repeats so polling
//! views keep receiving it. Delays use `tokio::time`, so paused-clock tests
//! control arrival order exactly.

#![allow(missing_docs)]

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{
    Event, EventPage, EventQuery, FixPage, FixQuery, HealthReport, PurgeOutcome, QueueStats,
    RetryOutcome, ServerInfo, Stats,
};
use super::{DashboardApi, GatewayError, GatewayResult};

pub const STATS: &str = "stats";
pub const EVENTS: &str = "events";
pub const EVENT: &str = "event";
pub const FIXES: &str = "fixes";
pub const QUEUE: &str = "queue";
pub const RETRY: &str = "retry";
pub const PURGE: &str = "purge";
pub const HEALTH: &str = "health";
pub const INFO: &str = "info";

#[derive(Clone)]
struct Reply {
    delay: Duration,
    body: GatewayResult<Value>,
}

#[derive(Default)]
pub struct FakeApi {
    replies: Mutex<HashMap<&'static str, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, endpoint: &'static str, body: Value) -> &Self {
        self.push(endpoint, Duration::ZERO, Ok(body))
    }

    pub fn reply_after(&self, endpoint: &'static str, delay: Duration, body: Value) -> &Self {
        self.push(endpoint, delay, Ok(body))
    }

    pub fn fail(&self, endpoint: &'static str, error: GatewayError) -> &Self {
        self.push(endpoint, Duration::ZERO, Err(error))
    }

    pub fn fail_after(
        &self,
        endpoint: &'static str,
        delay: Duration,
        error: GatewayError,
    ) -> &Self {
        self.push(endpoint, delay, Err(error))
    }

    /// Every call so far, e.g. `events?page=2&limit=10`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn push(&self, endpoint: &'static str, delay: Duration, body: GatewayResult<Value>) -> &Self {
        self.replies
            .lock()
            .entry(endpoint)
            .or_default()
            .push_back(Reply { delay, body });
        self
    }

    async fn answer<T>(&self, endpoint: &'static str, call: String) -> GatewayResult<T>
    where
        T: DeserializeOwned,
    {
        self.calls.lock().push(call);
        let reply = {
            let mut replies = self.replies.lock();
            let queue = replies.entry(endpoint).or_default();
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };
        let Some(reply) = reply else {
            return Err(GatewayError::transport(format!("no scripted reply for {endpoint}")));
        };
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        serde_json::from_value(reply.body?).map_err(|e| GatewayError::malformed(endpoint, e))
    }
}

fn with_pairs(endpoint: &str, pairs: &[(&'static str, String)]) -> String {
    let query: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{endpoint}?{}", query.join("&"))
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn fetch_summary_stats(&self) -> GatewayResult<Stats> {
        self.answer(STATS, STATS.to_owned()).await
    }

    async fn fetch_events(&self, query: &EventQuery) -> GatewayResult<EventPage> {
        self.answer(EVENTS, with_pairs(EVENTS, &query.to_pairs())).await
    }

    async fn fetch_event(&self, id: &str) -> GatewayResult<Event> {
        self.answer(EVENT, format!("{EVENT}/{id}")).await
    }

    async fn fetch_fixes(&self, query: &FixQuery) -> GatewayResult<FixPage> {
        self.answer(FIXES, with_pairs(FIXES, &query.to_pairs())).await
    }

    async fn fetch_queue_stats(&self) -> GatewayResult<QueueStats> {
        self.answer(QUEUE, QUEUE.to_owned()).await
    }

    async fn retry_failed_jobs(&self) -> GatewayResult<RetryOutcome> {
        self.answer(RETRY, RETRY.to_owned()).await
    }

    async fn purge_queue(&self) -> GatewayResult<PurgeOutcome> {
        self.answer(PURGE, PURGE.to_owned()).await
    }

    async fn fetch_health(&self) -> GatewayResult<HealthReport> {
        self.answer(HEALTH, HEALTH.to_owned()).await
    }

    async fn fetch_server_info(&self) -> GatewayResult<ServerInfo> {
        self.answer(INFO, INFO.to_owned()).await
    }
}

// ──────────────────── sample bodies ────────────────────

pub fn stats_body(total: u64) -> Value {
    serde_json::json!({
        "totalEvents": total,
        "fixedEvents": 0,
        "failedEvents": 0,
        "pendingEvents": total,
        "successRate": 0.0,
        "recentEvents": [],
        "topRepos": []
    })
}

pub fn page_body(key: &str, page: u32, pages: u32) -> Value {
    let mut body = serde_json::json!({
        "pagination": { "page": page, "limit": 10, "total": u64::from(pages) * 10, "pages": pages }
    });
    body[key] = Value::Array(Vec::new());
    body
}

pub fn queue_body(failed: u64) -> Value {
    serde_json::json!({
        "counts": { "waiting": 0, "active": 0, "completed": 3, "failed": failed },
        "active": 0,
        "waiting": 0,
        "failed": failed,
        "recentFailed": []
    })
}

pub fn health_body(status: &str) -> Value {
    serde_json::json!({ "status": status, "timestamp": "2026-01-01T00:00:00Z" })
}

pub fn info_body(status: &str) -> Value {
    serde_json::json!({ "name": "fix-bot", "version": "1.2.0", "status": status })
}
