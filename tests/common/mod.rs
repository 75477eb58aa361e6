//! Stub monitoring service for gateway integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use fixpulse::core::config::GatewayConfig;
use fixpulse::gateway::HttpGateway;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// Requests seen by the stub, as `METHOD path?query`.
pub type Hits = Arc<Mutex<Vec<String>>>;

/// A running stub server. Dropping it stops serving.
pub struct StubServer {
    pub base_url: String,
    task: JoinHandle<()>,
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serve `router` on an ephemeral loopback port.
pub async fn serve(router: Router) -> StubServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    let task = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    StubServer {
        base_url: format!("http://{addr}"),
        task,
    }
}

/// Gateway pointed at `base_url` with the given request bound.
pub fn gateway(base_url: &str, timeout: Duration) -> HttpGateway {
    HttpGateway::new(&GatewayConfig {
        base_url: base_url.to_owned(),
        timeout_ms: u64::try_from(timeout.as_millis()).expect("timeout fits u64"),
    })
    .expect("valid gateway config")
}

/// Loopback address with nothing listening on it.
pub fn closed_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{addr}")
}

pub fn event_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "repoFullName": "acme/api",
        "repoOwner": "acme",
        "repoName": "api",
        "branch": "main",
        "commitSha": "4f2a9c1",
        "status": status,
        "errorType": "TypeError",
        "errorMessage": "cannot read properties of undefined",
        "filePath": "src/handler.ts",
        "lineNumber": 42,
        "createdAt": "2026-03-01T10:00:00Z",
        "updatedAt": "2026-03-01T10:05:00Z",
        "fixAttempts": [{
            "id": "fix-1",
            "failureEventId": id,
            "originalCode": "a.b",
            "fixedCode": "a?.b",
            "diffSummary": "guard optional access",
            "confidence": 0.93,
            "status": "success",
            "prUrl": "https://git.example.test/acme/api/pull/7",
            "createdAt": "2026-03-01T10:04:00Z"
        }]
    })
}

pub fn event_page_json(events: Vec<Value>, page: u32, pages: u32) -> Value {
    json!({
        "events": events,
        "pagination": { "page": page, "limit": 10, "total": u64::from(pages) * 10, "pages": pages }
    })
}

pub fn queue_json(failed: u64) -> Value {
    json!({
        "counts": { "waiting": 1, "active": 2, "completed": 9, "failed": failed },
        "active": 2,
        "waiting": 1,
        "failed": failed,
        "recentFailed": []
    })
}
