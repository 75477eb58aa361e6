//! FXP-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::gateway::errors::GatewayError;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, FxpError>;

/// Top-level error type for fixpulse.
#[derive(Debug, Error)]
pub enum FxpError {
    #[error("[FXP-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[FXP-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[FXP-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[FXP-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[FXP-2900] gateway failure: {source}")]
    Gateway {
        #[from]
        source: GatewayError,
    },

    #[error("[FXP-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[FXP-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl FxpError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "FXP-1001",
            Self::MissingConfig { .. } => "FXP-1002",
            Self::ConfigParse { .. } => "FXP-1003",
            Self::Serialization { .. } => "FXP-2101",
            Self::Gateway { source } => source.code(),
            Self::Io { .. } => "FXP-3002",
            Self::Runtime { .. } => "FXP-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway { .. } | Self::Io { .. } | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for FxpError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for FxpError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
