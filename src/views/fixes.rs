//! Paginated fix-attempt list with a client-side confidence filter.
//!
//! The fixes endpoint has no confidence parameter, so the bucket filter is
//! applied to each fetched page. Pagination metadata stays as the server
//! reported it.

#![allow(missing_docs)]

use async_trait::async_trait;

use crate::gateway::types::{FixPage, FixQuery, Pagination};
use crate::gateway::{DashboardApi, GatewayResult};
use crate::query::{ConfidenceFilter, QueryState};
use crate::sync::{QueryDriven, ViewSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixesParams {
    pub query: FixQuery,
    pub confidence: ConfidenceFilter,
}

#[derive(Debug, Clone, Copy)]
pub struct FixesView {
    page_size: u32,
}

impl FixesView {
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self { page_size }
    }
}

/// Keep only fixes inside the selected confidence bucket.
#[must_use]
pub fn filter_by_confidence(mut page: FixPage, confidence: ConfidenceFilter) -> FixPage {
    page.fixes.retain(|fix| confidence.matches(fix.confidence));
    page
}

#[async_trait]
impl ViewSource for FixesView {
    type Params = FixesParams;
    type Data = FixPage;

    fn name(&self) -> &'static str {
        "fixes"
    }

    async fn load(&self, api: &dyn DashboardApi, params: &FixesParams) -> GatewayResult<FixPage> {
        let page = api.fetch_fixes(&params.query).await?;
        Ok(filter_by_confidence(page, params.confidence))
    }

    fn fallback(&self) -> Option<FixPage> {
        Some(FixPage {
            fixes: Vec::new(),
            pagination: Pagination::empty(self.page_size),
        })
    }
}

impl QueryDriven for FixesView {
    fn params_for(&self, query: &QueryState) -> FixesParams {
        FixesParams {
            query: FixQuery {
                page: query.page.max(1),
                limit: self.page_size,
            },
            confidence: query.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::gateway::fake::{self, FakeApi};
    use crate::gateway::types::ConfidenceBucket;

    fn fix(id: &str, confidence: f64) -> serde_json::Value {
        json!({
            "id": id,
            "failureEventId": "evt-1",
            "originalCode": "a",
            "fixedCode": "b",
            "diffSummary": "-a +b",
            "confidence": confidence,
            "status": "success",
            "createdAt": "2026-01-01T00:00:00Z"
        })
    }

    fn page_with(fixes: Vec<serde_json::Value>) -> serde_json::Value {
        json!({
            "fixes": fixes,
            "pagination": { "page": 1, "limit": 10, "total": 3, "pages": 1 }
        })
    }

    #[tokio::test]
    async fn bucket_filter_is_applied_to_fetched_page() {
        let api = FakeApi::new();
        api.reply(
            fake::FIXES,
            page_with(vec![fix("a", 0.95), fix("b", 0.8), fix("c", 0.4)]),
        );
        let view = FixesView::new(10);
        let params = view.params_for(&QueryState {
            confidence: ConfidenceFilter::Only(ConfidenceBucket::Medium),
            ..QueryState::default()
        });

        let page = view.load(&*api, &params).await.unwrap();
        let ids: Vec<&str> = page.fixes.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(page.pagination.total, 3);
        assert_eq!(api.calls(), vec!["fixes?page=1&limit=10".to_owned()]);
    }

    #[tokio::test]
    async fn all_keeps_every_fix() {
        let api = FakeApi::new();
        api.reply(fake::FIXES, page_with(vec![fix("a", 0.95), fix("c", 0.1)]));
        let view = FixesView::new(10);
        let params = view.params_for(&QueryState::default());
        let page = view.load(&*api, &params).await.unwrap();
        assert_eq!(page.fixes.len(), 2);
    }

    #[test]
    fn params_follow_page_and_confidence_only() {
        let view = FixesView::new(20);
        let params = view.params_for(&QueryState {
            page: 4,
            search: "ignored".to_owned(),
            ..QueryState::default()
        });
        assert_eq!(params.query, FixQuery { page: 4, limit: 20 });
        assert_eq!(params.confidence, ConfidenceFilter::All);
    }
}
