//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use fixpulse::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, FailurePolicy};
pub use crate::core::errors::{FxpError, Result};

// Gateway
pub use crate::gateway::types::{Event, EventPage, FixAttempt, FixPage, QueueStats, Stats};
pub use crate::gateway::{DashboardApi, GatewayError, HttpGateway};

// Query state
pub use crate::pagination::{PageControls, compute_window};
pub use crate::query::sync::{Location, MemoryLocation, QuerySync};
pub use crate::query::{ConfidenceFilter, QueryState, StatusFilter};

// Sync
pub use crate::sync::{FetchPhase, FetchState, MountOptions, ViewHandle, ViewSource};

// Views
pub use crate::health::{HealthMonitor, HealthSnapshot};
pub use crate::views::{QueueActions, Views};

// Logging
pub use crate::logger::jsonl::{JsonlConfig, JsonlWriter, SharedLog};
