//! Single event with its fix attempts, keyed by event id.

#![allow(missing_docs)]

use async_trait::async_trait;

use crate::gateway::types::Event;
use crate::gateway::{DashboardApi, GatewayError, GatewayResult};
use crate::sync::ViewSource;

/// Parameters are the event id; switching ids refetches.
///
/// There is no placeholder: a fabricated event would be indistinguishable
/// from a real one, so failures always surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDetailView;

#[async_trait]
impl ViewSource for EventDetailView {
    type Params = String;
    type Data = Event;

    fn name(&self) -> &'static str {
        "event_detail"
    }

    async fn load(&self, api: &dyn DashboardApi, id: &String) -> GatewayResult<Event> {
        let id = id.trim();
        if id.is_empty() {
            return Err(GatewayError::not_found("/api/events/"));
        }
        api.fetch_event(id).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::gateway::GatewayErrorKind;
    use crate::gateway::fake::{self, FakeApi};

    #[tokio::test]
    async fn loads_event_by_id() {
        let api = FakeApi::new();
        api.reply(
            fake::EVENT,
            json!({
                "id": "evt-9",
                "repoFullName": "acme/api",
                "repoOwner": "acme",
                "repoName": "api",
                "branch": "main",
                "commitSha": "abc123",
                "status": "FIXED",
                "errorType": "TypeError",
                "errorMessage": "x is undefined",
                "filePath": "src/x.ts",
                "lineNumber": 42,
                "createdAt": "2026-01-01T00:00:00Z",
                "updatedAt": "2026-01-01T00:05:00Z"
            }),
        );
        let event = EventDetailView
            .load(&*api, &"evt-9".to_owned())
            .await
            .unwrap();
        assert_eq!(event.repo_full_name, "acme/api");
        assert!(event.fix_attempts.is_empty());
        assert_eq!(api.calls(), vec!["event/evt-9".to_owned()]);
    }

    #[tokio::test]
    async fn blank_id_is_not_found_without_a_request() {
        let api = FakeApi::new();
        let err = EventDetailView
            .load(&*api, &"  ".to_owned())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), GatewayErrorKind::NotFound);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn has_no_placeholder() {
        assert!(EventDetailView.fallback().is_none());
    }
}
