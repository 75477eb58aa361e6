//! Server health monitor: two concurrent liveness probes folded into one
//! online/offline/unknown tri-state.
//!
//! `online = health.status == "healthy" || info.status == "running"`. A probe
//! that fails counts as absent; both absent means offline. Before the first
//! probe round completes the state is unknown (`None`).

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::core::config::FailurePolicy;
use crate::gateway::types::{HealthReport, ServerInfo};
use crate::gateway::{DashboardApi, GatewayResult};
use crate::logger::jsonl::{EventType, LogEntry, Severity, SharedLog, record};
use crate::sync::{FetchState, MountOptions, ViewHandle, ViewSource, mount};

/// Derived server status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    /// `None` until the first probe round completes.
    pub online: Option<bool>,
    pub last_checked: Option<DateTime<Utc>>,
    /// Last name reported by the info probe, kept across failed rounds.
    pub server_name: Option<String>,
    pub server_version: Option<String>,
}

impl HealthSnapshot {
    /// Snapshot for a monitor's fetch state; unknown until data arrives.
    #[must_use]
    pub fn from_state(state: &FetchState<Self>) -> Self {
        state.data.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self.online {
            Some(true) => "online",
            Some(false) => "offline",
            None => "unknown",
        }
    }
}

/// Either probe reporting a live status is enough.
#[must_use]
pub fn derive_online(health: Option<&HealthReport>, info: Option<&ServerInfo>) -> bool {
    health.is_some_and(|h| h.status == "healthy") || info.is_some_and(|i| i.status == "running")
}

/// Probe pair as a pollable view. Loading never fails; probe failures are
/// folded into the snapshot.
///
/// Online/offline flips are logged from each polling round, independent
/// of [`HealthMonitor::changed`].
#[derive(Default)]
pub struct ServerStatusView {
    log: Option<SharedLog>,
    last_online: Mutex<Option<bool>>,
}

impl ServerStatusView {
    #[must_use]
    pub fn with_log(log: Option<SharedLog>) -> Self {
        Self {
            log,
            last_online: Mutex::new(None),
        }
    }

    fn note_round(&self, online: bool) {
        if self.last_online.lock().replace(online) == Some(online) {
            return;
        }
        let (severity, label) = if online {
            (Severity::Info, "online")
        } else {
            (Severity::Warning, "offline")
        };
        let entry = LogEntry::new(EventType::HealthChanged, severity)
            .view("health")
            .details(label);
        record(self.log.as_ref(), &entry);
    }
}

#[async_trait]
impl ViewSource for ServerStatusView {
    type Params = ();
    type Data = HealthSnapshot;

    fn name(&self) -> &'static str {
        "health"
    }

    async fn load(&self, api: &dyn DashboardApi, _params: &()) -> GatewayResult<HealthSnapshot> {
        let (health, info) = tokio::join!(api.fetch_health(), api.fetch_server_info());
        let health = health.ok();
        let info = info.ok();
        let online = derive_online(health.as_ref(), info.as_ref());
        self.note_round(online);
        Ok(HealthSnapshot {
            online: Some(online),
            last_checked: Some(Utc::now()),
            server_name: info.as_ref().map(|i| i.name.clone()),
            server_version: info.map(|i| i.version),
        })
    }

    fn merge(previous: Option<&HealthSnapshot>, mut incoming: HealthSnapshot) -> HealthSnapshot {
        if incoming.server_name.is_none()
            && let Some(previous) = previous
        {
            incoming.server_name.clone_from(&previous.server_name);
            incoming.server_version.clone_from(&previous.server_version);
        }
        incoming
    }
}

/// Mounted health monitor. Dropping it stops polling.
pub struct HealthMonitor {
    handle: ViewHandle<(), HealthSnapshot>,
}

impl HealthMonitor {
    /// Start probing immediately, then every `interval`.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn mount(api: Arc<dyn DashboardApi>, interval: Duration, log: Option<SharedLog>) -> Self {
        let options = MountOptions::new(interval, FailurePolicy::Error).with_log(log.clone());
        Self {
            handle: mount(ServerStatusView::with_log(log), api, (), options),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot::from_state(&self.handle.snapshot())
    }

    /// Probe now instead of waiting for the next tick.
    pub fn refresh(&self) {
        self.handle.refresh();
    }

    /// Wait for the next probe round. `None` once the monitor is gone.
    pub async fn changed(&mut self) -> Option<HealthSnapshot> {
        loop {
            let state = self.handle.changed().await?;
            if state.data.is_none() {
                continue;
            }
            return Some(HealthSnapshot::from_state(&state));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::gateway::fake::{self, FakeApi};
    use crate::logger::jsonl::{JsonlConfig, JsonlWriter};

    fn report(status: &str) -> HealthReport {
        HealthReport {
            status: status.to_owned(),
            timestamp: "2026-01-01T00:00:00Z".to_owned(),
        }
    }

    fn info(status: &str) -> ServerInfo {
        ServerInfo {
            name: "fix-bot".to_owned(),
            version: "1.2.0".to_owned(),
            status: status.to_owned(),
        }
    }

    #[test]
    fn derivation_truth_table() {
        assert!(derive_online(Some(&report("healthy")), None));
        assert!(derive_online(None, Some(&info("running"))));
        assert!(derive_online(Some(&report("degraded")), Some(&info("running"))));
        assert!(!derive_online(Some(&report("degraded")), Some(&info("stopped"))));
        assert!(!derive_online(None, None));
    }

    #[test]
    fn unknown_before_first_probe() {
        let snapshot = HealthSnapshot::from_state(&FetchState::default());
        assert_eq!(snapshot.online, None);
        assert_eq!(snapshot.label(), "unknown");
    }

    #[test]
    fn merge_keeps_last_known_server_info() {
        let previous = HealthSnapshot {
            online: Some(true),
            last_checked: None,
            server_name: Some("fix-bot".to_owned()),
            server_version: Some("1.2.0".to_owned()),
        };
        let incoming = HealthSnapshot {
            online: Some(false),
            ..HealthSnapshot::default()
        };
        let merged = ServerStatusView::merge(Some(&previous), incoming);
        assert_eq!(merged.online, Some(false));
        assert_eq!(merged.server_name.as_deref(), Some("fix-bot"));
        assert_eq!(merged.server_version.as_deref(), Some("1.2.0"));
    }

    #[tokio::test]
    async fn one_healthy_probe_is_enough() {
        let api = FakeApi::new();
        api.reply(fake::HEALTH, fake::health_body("healthy"))
            .fail(fake::INFO, GatewayError::transport("refused"));
        let snapshot = ServerStatusView::default().load(&*api, &()).await.unwrap();
        assert_eq!(snapshot.online, Some(true));
        assert_eq!(snapshot.server_name, None);
        assert!(snapshot.last_checked.is_some());
    }

    #[tokio::test]
    async fn both_probes_failing_is_offline() {
        let api = FakeApi::new();
        api.fail(fake::HEALTH, GatewayError::transport("refused"))
            .fail(fake::INFO, GatewayError::transport("refused"));
        let snapshot = ServerStatusView::default().load(&*api, &()).await.unwrap();
        assert_eq!(snapshot.online, Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_reports_transitions() {
        let api = FakeApi::new();
        api.reply(fake::HEALTH, fake::health_body("healthy"))
            .fail(fake::HEALTH, GatewayError::transport("refused"));
        api.reply(fake::INFO, fake::info_body("running"))
            .fail(fake::INFO, GatewayError::transport("refused"));

        let mut monitor = HealthMonitor::mount(api.clone(), Duration::from_secs(30), None);
        assert_eq!(monitor.snapshot().online, None);

        let first = monitor.changed().await.unwrap();
        assert_eq!(first.online, Some(true));
        assert_eq!(first.server_version.as_deref(), Some("1.2.0"));

        let second = monitor.changed().await.unwrap();
        assert_eq!(second.online, Some(false));
        assert_eq!(second.server_name.as_deref(), Some("fix-bot"));
        assert_eq!(api.count(fake::HEALTH), 2);
        assert_eq!(api.count(fake::INFO), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transitions_are_logged_without_awaiting_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("health.jsonl");
        let log = JsonlWriter::open(JsonlConfig::at(&path)).shared();
        let api = FakeApi::new();
        api.reply(fake::HEALTH, fake::health_body("healthy"))
            .fail(fake::HEALTH, GatewayError::transport("refused"));
        api.fail(fake::INFO, GatewayError::transport("refused"));

        let monitor = HealthMonitor::mount(api.clone(), Duration::from_secs(30), Some(log));
        // Three rounds: online, offline, offline again.
        for _ in 0..65 {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        assert_eq!(monitor.snapshot().online, Some(false));
        assert!(api.count(fake::HEALTH) >= 3);

        let raw = std::fs::read_to_string(&path).unwrap();
        let flips: Vec<serde_json::Value> = raw
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
            .filter(|entry| entry["event"] == "health_changed")
            .collect();
        assert_eq!(flips.len(), 2);
        assert_eq!(flips[0]["details"], "online");
        assert_eq!(flips[1]["details"], "offline");
        assert_eq!(flips[1]["severity"], "warning");
    }
}
