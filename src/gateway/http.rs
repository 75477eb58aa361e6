//! `reqwest`-backed gateway with a fixed base address and request timeout.

#![allow(missing_docs)]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::errors::GatewayError;
use super::types::{
    Event, EventPage, EventQuery, FixPage, FixQuery, HealthReport, PurgeOutcome, QueueStats,
    RetryOutcome, ServerInfo, Stats, Validate,
};
use super::{DashboardApi, GatewayResult};
use crate::core::config::GatewayConfig;
use crate::core::errors::{FxpError, Result};

/// HTTP implementation of [`DashboardApi`].
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpGateway {
    /// Build a gateway from validated configuration.
    ///
    /// # Errors
    /// Returns `InvalidConfig` when the base address does not parse or the
    /// TLS backend cannot be initialised.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| FxpError::InvalidConfig {
            details: format!("gateway.base_url {:?}: {e}", config.base_url),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(FxpError::InvalidConfig {
                details: format!("gateway.base_url {:?} cannot carry a path", config.base_url),
            });
        }
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fixpulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FxpError::InvalidConfig {
                details: format!("http client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve path segments under the base address, percent-encoding each.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if !segments.is_empty()
            && let Ok(mut path) = url.path_segments_mut()
        {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn call<T>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&'static str, String)],
    ) -> GatewayResult<T>
    where
        T: DeserializeOwned + Validate,
    {
        let label = format!("/{}", segments.join("/"));
        let mut request = self.client.request(method, self.endpoint(segments));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify(&label, &e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found(&label));
        }
        if !status.is_success() {
            return Err(GatewayError::http(&label, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(&label, &e))?;
        let value: T =
            serde_json::from_slice(&body).map_err(|e| GatewayError::malformed(&label, e))?;
        value
            .validate()
            .map_err(|details| GatewayError::malformed(&label, details))?;
        Ok(value)
    }

    fn classify(&self, label: &str, err: &reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            let ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
            GatewayError::timeout(label, ms)
        } else {
            GatewayError::transport(err)
        }
    }
}

#[async_trait]
impl DashboardApi for HttpGateway {
    async fn fetch_summary_stats(&self) -> GatewayResult<Stats> {
        self.call(Method::GET, &["api", "stats"], &[]).await
    }

    async fn fetch_events(&self, query: &EventQuery) -> GatewayResult<EventPage> {
        self.call(Method::GET, &["api", "events"], &query.to_pairs())
            .await
    }

    async fn fetch_event(&self, id: &str) -> GatewayResult<Event> {
        self.call(Method::GET, &["api", "events", id], &[]).await
    }

    async fn fetch_fixes(&self, query: &FixQuery) -> GatewayResult<FixPage> {
        self.call(Method::GET, &["api", "fixes"], &query.to_pairs())
            .await
    }

    async fn fetch_queue_stats(&self) -> GatewayResult<QueueStats> {
        self.call(Method::GET, &["api", "queue"], &[]).await
    }

    async fn retry_failed_jobs(&self) -> GatewayResult<RetryOutcome> {
        self.call(Method::POST, &["api", "queue", "retry-failed"], &[])
            .await
    }

    async fn purge_queue(&self) -> GatewayResult<PurgeOutcome> {
        self.call(Method::POST, &["api", "queue", "clean"], &[])
            .await
    }

    async fn fetch_health(&self) -> GatewayResult<HealthReport> {
        self.call(Method::GET, &["webhooks", "health"], &[]).await
    }

    async fn fetch_server_info(&self) -> GatewayResult<ServerInfo> {
        self.call(Method::GET, &[], &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(&GatewayConfig {
            base_url: base.to_owned(),
            timeout_ms: 10_000,
        })
        .unwrap()
    }

    #[test]
    fn endpoint_appends_segments() {
        let gw = gateway("http://localhost:3000");
        assert_eq!(
            gw.endpoint(&["api", "queue", "retry-failed"]).as_str(),
            "http://localhost:3000/api/queue/retry-failed"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let gw = gateway("http://example.test/dash/");
        assert_eq!(
            gw.endpoint(&["api", "stats"]).as_str(),
            "http://example.test/dash/api/stats"
        );
    }

    #[test]
    fn endpoint_encodes_event_ids() {
        let gw = gateway("http://localhost:3000");
        assert_eq!(
            gw.endpoint(&["api", "events", "a/b c"]).as_str(),
            "http://localhost:3000/api/events/a%2Fb%20c"
        );
    }

    #[test]
    fn root_endpoint_is_base() {
        let gw = gateway("http://localhost:3000");
        assert_eq!(gw.endpoint(&[]).as_str(), "http://localhost:3000/");
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = HttpGateway::new(&GatewayConfig {
            base_url: "not a url".to_owned(),
            timeout_ms: 10_000,
        })
        .unwrap_err();
        assert_eq!(err.code(), "FXP-1001");
    }
}
