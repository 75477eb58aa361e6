//! Normalized gateway failure.
//!
//! Transport, timeout, HTTP status, missing resource, and schema failures all
//! collapse into one [`GatewayError`] carrying a human-readable message. The
//! [`GatewayErrorKind`] is kept for log codes only; controllers render the
//! message and never branch on the kind.

#![allow(missing_docs)]

use thiserror::Error;

/// Which layer of the request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Network unreachable, DNS failure, connection refused.
    Transport,
    /// Request exceeded the configured bound.
    Timeout,
    /// Non-2xx response other than 404.
    Http { status: u16 },
    /// The requested resource id is unknown to the server.
    NotFound,
    /// Response body does not match the expected shape.
    Malformed,
}

/// Single failure type returned by every gateway operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GatewayError {
    kind: GatewayErrorKind,
    message: String,
}

impl GatewayError {
    #[must_use]
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transport(details: impl std::fmt::Display) -> Self {
        Self::new(
            GatewayErrorKind::Transport,
            format!("Failed to connect to backend: {details}"),
        )
    }

    #[must_use]
    pub fn timeout(endpoint: &str, after_ms: u64) -> Self {
        Self::new(
            GatewayErrorKind::Timeout,
            format!("Request to {endpoint} timed out after {after_ms} ms"),
        )
    }

    #[must_use]
    pub fn http(endpoint: &str, status: u16) -> Self {
        Self::new(
            GatewayErrorKind::Http { status },
            format!("Request to {endpoint} failed with HTTP {status}"),
        )
    }

    #[must_use]
    pub fn not_found(endpoint: &str) -> Self {
        Self::new(
            GatewayErrorKind::NotFound,
            format!("Resource not found: {endpoint}"),
        )
    }

    #[must_use]
    pub fn malformed(endpoint: &str, details: impl std::fmt::Display) -> Self {
        Self::new(
            GatewayErrorKind::Malformed,
            format!("Unexpected response from {endpoint}: {details}"),
        )
    }

    /// Human-readable message, identical to `Display`.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn kind(&self) -> GatewayErrorKind {
        self.kind
    }

    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self.kind {
            GatewayErrorKind::Transport => "FXP-2001",
            GatewayErrorKind::Timeout => "FXP-2002",
            GatewayErrorKind::Http { .. } => "FXP-2003",
            GatewayErrorKind::NotFound => "FXP-2004",
            GatewayErrorKind::Malformed => "FXP-2005",
        }
    }
}
