//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::errors::{FxpError, Result};

/// Base address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Polling intervals below this are rejected.
pub const MIN_POLL_INTERVAL_MS: u64 = 1_000;

/// Full fixpulse configuration model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// Remote service address and request bound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

/// What a view shows when a visible fetch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Surface an explicit error with a retry affordance.
    #[default]
    Error,
    /// Substitute placeholder data and keep the error internal.
    Fallback,
}

impl FailurePolicy {
    fn parse(name: &str, raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "fallback" => Ok(Self::Fallback),
            other => Err(FxpError::InvalidConfig {
                details: format!("{name}: expected error|fallback, got {other:?}"),
            }),
        }
    }
}

/// Per-view refresh cadence and list sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollingConfig {
    pub dashboard_ms: u64,
    pub events_ms: u64,
    pub fixes_ms: u64,
    pub queue_ms: u64,
    pub event_detail_ms: u64,
    pub health_ms: u64,
    pub failure_policy: FailurePolicy,
    pub page_size: u32,
}

/// JSONL activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub jsonl_path: PathBuf,
}

/// Filesystem paths used by fixpulse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_ms: 10_000,
        }
    }
}

impl GatewayConfig {
    fn parsed_base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| FxpError::InvalidConfig {
            details: format!("gateway.base_url {:?}: {e}", self.base_url),
        })
    }

    /// Address the CI provider posts build events to, under the base path.
    pub fn webhook_url(&self) -> Result<Url> {
        let mut url = self.parsed_base_url()?;
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["webhooks", "github"]);
        }
        Ok(url)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            dashboard_ms: 30_000,
            events_ms: 15_000,
            fixes_ms: 15_000,
            queue_ms: 5_000,
            event_detail_ms: 15_000,
            health_ms: 30_000,
            failure_policy: FailurePolicy::Error,
            page_size: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            jsonl_path: data_dir().join("activity.jsonl"),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_file: home_dir()
                .join(".config")
                .join("fixpulse")
                .join("config.toml"),
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub fn dashboard(&self) -> Duration {
        Duration::from_millis(self.dashboard_ms)
    }

    #[must_use]
    pub fn events(&self) -> Duration {
        Duration::from_millis(self.events_ms)
    }

    #[must_use]
    pub fn fixes(&self) -> Duration {
        Duration::from_millis(self.fixes_ms)
    }

    #[must_use]
    pub fn queue(&self) -> Duration {
        Duration::from_millis(self.queue_ms)
    }

    #[must_use]
    pub fn event_detail(&self) -> Duration {
        Duration::from_millis(self.event_detail_ms)
    }

    #[must_use]
    pub fn health(&self) -> Duration {
        Duration::from_millis(self.health_ms)
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| FxpError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(FxpError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // gateway; the legacy frontend variable is honoured when ours is unset
        if let Some(raw) = lookup("FIXPULSE_API_URL").or_else(|| lookup("VITE_API_URL")) {
            self.gateway.base_url = raw;
        }
        if let Some(raw) = lookup("FIXPULSE_TIMEOUT_MS") {
            self.gateway.timeout_ms = parse_env_u64("FIXPULSE_TIMEOUT_MS", &raw)?;
        }

        // polling
        let intervals: [(&str, &mut u64); 6] = [
            ("FIXPULSE_POLL_DASHBOARD_MS", &mut self.polling.dashboard_ms),
            ("FIXPULSE_POLL_EVENTS_MS", &mut self.polling.events_ms),
            ("FIXPULSE_POLL_FIXES_MS", &mut self.polling.fixes_ms),
            ("FIXPULSE_POLL_QUEUE_MS", &mut self.polling.queue_ms),
            (
                "FIXPULSE_POLL_EVENT_DETAIL_MS",
                &mut self.polling.event_detail_ms,
            ),
            ("FIXPULSE_POLL_HEALTH_MS", &mut self.polling.health_ms),
        ];
        for (name, slot) in intervals {
            if let Some(raw) = lookup(name) {
                *slot = parse_env_u64(name, &raw)?;
            }
        }
        if let Some(raw) = lookup("FIXPULSE_FAILURE_POLICY") {
            self.polling.failure_policy = FailurePolicy::parse("FIXPULSE_FAILURE_POLICY", &raw)?;
        }
        if let Some(raw) = lookup("FIXPULSE_PAGE_SIZE") {
            let size = parse_env_u64("FIXPULSE_PAGE_SIZE", &raw)?;
            self.polling.page_size = u32::try_from(size).map_err(|_| FxpError::InvalidConfig {
                details: format!("FIXPULSE_PAGE_SIZE out of range: {size}"),
            })?;
        }

        // logging
        if let Some(raw) = lookup("FIXPULSE_LOG_ENABLED") {
            self.logging.enabled = parse_env_bool("FIXPULSE_LOG_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("FIXPULSE_LOG_PATH") {
            self.logging.jsonl_path = PathBuf::from(raw);
            self.logging.enabled = true;
        }

        Ok(())
    }

    /// Replace the gateway address (e.g. from a command-line flag) and
    /// re-validate.
    pub fn override_base_url(&mut self, raw: &str) -> Result<()> {
        self.gateway.base_url = raw.to_owned();
        self.normalize();
        self.validate()
    }

    fn normalize(&mut self) {
        let trimmed = self.gateway.base_url.trim();
        if trimmed.len() != self.gateway.base_url.len() {
            self.gateway.base_url = trimmed.to_owned();
        }
    }

    fn validate(&self) -> Result<()> {
        let url = self.gateway.parsed_base_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FxpError::InvalidConfig {
                details: format!("gateway.base_url must be http or https, got {}", url.scheme()),
            });
        }
        if self.gateway.timeout_ms == 0 {
            return Err(FxpError::InvalidConfig {
                details: "gateway.timeout_ms must be > 0".to_owned(),
            });
        }

        let intervals = [
            ("polling.dashboard_ms", self.polling.dashboard_ms),
            ("polling.events_ms", self.polling.events_ms),
            ("polling.fixes_ms", self.polling.fixes_ms),
            ("polling.queue_ms", self.polling.queue_ms),
            ("polling.event_detail_ms", self.polling.event_detail_ms),
            ("polling.health_ms", self.polling.health_ms),
        ];
        for (name, value) in intervals {
            if value < MIN_POLL_INTERVAL_MS {
                return Err(FxpError::InvalidConfig {
                    details: format!("{name} must be >= {MIN_POLL_INTERVAL_MS}, got {value}"),
                });
            }
        }

        if !(1..=100).contains(&self.polling.page_size) {
            return Err(FxpError::InvalidConfig {
                details: format!(
                    "polling.page_size must be in 1..=100, got {}",
                    self.polling.page_size
                ),
            });
        }
        Ok(())
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[FXP-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("fixpulse")
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|e| FxpError::InvalidConfig {
        details: format!("{name}: expected unsigned integer, got {raw:?} ({e})"),
    })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(FxpError::InvalidConfig {
            details: format!("{name}: expected boolean, got {raw:?}"),
        }),
    }
}
