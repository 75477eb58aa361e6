//! Summary statistics view.

#![allow(missing_docs)]

use async_trait::async_trait;

use crate::gateway::types::Stats;
use crate::gateway::{DashboardApi, GatewayResult};
use crate::sync::ViewSource;

/// Aggregate counts, success rate, recent events, and top repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardView;

#[async_trait]
impl ViewSource for DashboardView {
    type Params = ();
    type Data = Stats;

    fn name(&self) -> &'static str {
        "dashboard"
    }

    async fn load(&self, api: &dyn DashboardApi, _params: &()) -> GatewayResult<Stats> {
        api.fetch_summary_stats().await
    }

    /// Zeroed counters.
    fn fallback(&self) -> Option<Stats> {
        Some(Stats::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::{self, FakeApi};

    #[tokio::test]
    async fn loads_summary_stats() {
        let api = FakeApi::new();
        api.reply(fake::STATS, fake::stats_body(12));
        let stats = DashboardView.load(&*api, &()).await.unwrap();
        assert_eq!(stats.total_events, 12);
        assert_eq!(api.calls(), vec!["stats".to_owned()]);
    }

    #[test]
    fn fallback_is_zeroed() {
        let stats = DashboardView.fallback().unwrap();
        assert_eq!(stats.total_events, 0);
        assert!(stats.recent_events.is_empty());
    }
}
