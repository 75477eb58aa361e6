//! State model for one polled view.
//!
//! A view's fetch lifecycle lives in [`FetchState`]. Inputs arrive as
//! [`SyncMsg`] values and side-effects leave as [`SyncCmd`] values; the
//! controller that connects them performs no I/O.

#![allow(missing_docs)]

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::gateway::{GatewayError, GatewayResult};

// ──────────────────── phases ────────────────────

/// Where a view is in its fetch lifecycle.
///
/// `Loading` is reserved for the first fetch of a view's lifetime (or a
/// retry while nothing has loaded); `Refreshing` for visible refetches while
/// data is on screen. Background ticks never change the phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPhase {
    #[default]
    Idle,
    Loading,
    Refreshing,
    Ready,
    Errored,
}

impl FetchPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Refreshing => "refreshing",
            Self::Ready => "ready",
            Self::Errored => "errored",
        }
    }

    /// A user-visible fetch is outstanding.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Loading | Self::Refreshing)
    }
}

/// What started a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchTrigger {
    Initial,
    Background,
    Manual,
    ParamsChanged,
    Revalidate,
}

impl FetchTrigger {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Background => "background",
            Self::Manual => "manual",
            Self::ParamsChanged => "params_changed",
            Self::Revalidate => "revalidate",
        }
    }
}

// ──────────────────── state ────────────────────

/// Renderer-facing state of one view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchState<T> {
    pub phase: FetchPhase,
    /// Last successfully applied payload (or placeholder, see `placeholder`).
    pub data: Option<T>,
    /// Error shown to the user. Cleared by the next successful fetch.
    pub error: Option<String>,
    /// Most recent failure of any kind, including silent background ones.
    pub last_error: Option<String>,
    /// Completion time of the last successful fetch.
    pub last_updated: Option<DateTime<Utc>>,
    /// `data` is substituted fallback content, not a server response.
    pub placeholder: bool,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            phase: FetchPhase::Idle,
            data: None,
            error: None,
            last_error: None,
            last_updated: None,
            placeholder: false,
        }
    }
}

impl<T> FetchState<T> {
    /// Real (non-placeholder) data is present.
    #[must_use]
    pub fn has_live_data(&self) -> bool {
        self.data.is_some() && !self.placeholder
    }
}

// ──────────────────── messages ────────────────────

/// Inputs to the controller.
#[derive(Debug)]
pub enum SyncMsg<P, T> {
    /// The view became visible with its initial parameters.
    Mount(P),
    /// The repeating timer fired.
    Tick,
    /// The user asked for fresh data.
    ManualRefresh,
    /// Silent refetch after a mutation elsewhere (e.g. a queue action).
    Revalidate,
    /// Filter or pagination parameters changed.
    ParamsChanged(P),
    /// A fetch finished.
    FetchCompleted {
        ticket: u64,
        result: GatewayResult<T>,
        at: DateTime<Utc>,
    },
    /// The view went away.
    Unmount,
}

/// Observations worth recording in the activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncNote {
    Issued { ticket: u64, trigger: FetchTrigger },
    Applied { ticket: u64, trigger: FetchTrigger },
    Failed {
        ticket: u64,
        trigger: FetchTrigger,
        error: GatewayError,
        surfaced: bool,
    },
    Discarded { ticket: u64 },
}

/// Side-effects requested by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncCmd<P> {
    None,
    /// Start a fetch tagged with `ticket`, superseding any outstanding one.
    Fetch { ticket: u64, params: P },
    /// (Re)start the repeating timer with the given period.
    ArmTimer(Duration),
    CancelTimer,
    /// Abandon any outstanding fetch.
    CancelFetch,
    Note(SyncNote),
    Batch(Vec<Self>),
}

impl<P> SyncCmd<P> {
    /// Flatten nested batches into execution order.
    #[must_use]
    pub fn into_vec(self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(cmds) => cmds.into_iter().flat_map(Self::into_vec).collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle_and_empty() {
        let state: FetchState<u32> = FetchState::default();
        assert_eq!(state.phase, FetchPhase::Idle);
        assert!(state.data.is_none());
        assert!(!state.has_live_data());
    }

    #[test]
    fn busy_phases() {
        assert!(FetchPhase::Loading.is_busy());
        assert!(FetchPhase::Refreshing.is_busy());
        assert!(!FetchPhase::Ready.is_busy());
        assert!(!FetchPhase::Errored.is_busy());
    }

    #[test]
    fn batches_flatten_in_order() {
        let cmd: SyncCmd<()> = SyncCmd::Batch(vec![
            SyncCmd::CancelTimer,
            SyncCmd::Batch(vec![SyncCmd::None, SyncCmd::CancelFetch]),
            SyncCmd::ArmTimer(Duration::from_secs(1)),
        ]);
        assert_eq!(
            cmd.into_vec(),
            vec![
                SyncCmd::CancelTimer,
                SyncCmd::CancelFetch,
                SyncCmd::ArmTimer(Duration::from_secs(1)),
            ]
        );
    }

    #[test]
    fn phase_serializes_lowercase() {
        let json = serde_json::to_string(&FetchPhase::Refreshing).unwrap();
        assert_eq!(json, "\"refreshing\"");
    }
}
