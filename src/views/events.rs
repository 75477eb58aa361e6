//! Paginated, filterable event list.

#![allow(missing_docs)]

use async_trait::async_trait;

use crate::gateway::types::{EventPage, EventQuery, Pagination};
use crate::gateway::{DashboardApi, GatewayResult};
use crate::query::QueryState;
use crate::sync::{QueryDriven, ViewSource};

/// Event list driven by page, status filter, and repository search.
#[derive(Debug, Clone, Copy)]
pub struct EventsView {
    page_size: u32,
}

impl EventsView {
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self { page_size }
    }
}

/// Map filter state to request parameters. `ALL` and empty search are omitted.
#[must_use]
pub fn event_query(query: &QueryState, page_size: u32) -> EventQuery {
    let search = query.search.trim();
    EventQuery {
        page: query.page.max(1),
        limit: page_size,
        status: query.status.status(),
        repo: (!search.is_empty()).then(|| search.to_owned()),
    }
}

#[async_trait]
impl ViewSource for EventsView {
    type Params = EventQuery;
    type Data = EventPage;

    fn name(&self) -> &'static str {
        "events"
    }

    async fn load(&self, api: &dyn DashboardApi, params: &EventQuery) -> GatewayResult<EventPage> {
        api.fetch_events(params).await
    }

    /// An empty page.
    fn fallback(&self) -> Option<EventPage> {
        Some(EventPage {
            events: Vec::new(),
            pagination: Pagination::empty(self.page_size),
        })
    }
}

impl QueryDriven for EventsView {
    fn params_for(&self, query: &QueryState) -> EventQuery {
        event_query(query, self.page_size)
    }
}
