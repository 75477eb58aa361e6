//! Pure poll-and-refresh state machine.
//!
//! Each fetch is tagged with a monotonically increasing ticket. Only the
//! response carrying the most recently issued ticket is applied; anything
//! else is stale and discarded. After unmount every message is ignored and
//! the state is frozen.

#![allow(missing_docs)]

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::model::{FetchPhase, FetchState, FetchTrigger, SyncCmd, SyncMsg, SyncNote};
use crate::core::config::FailurePolicy;
use crate::gateway::{GatewayError, GatewayResult};

/// Combines the previously applied payload with a freshly fetched one.
pub type MergeFn<T> = fn(Option<&T>, T) -> T;

fn replace<T>(_previous: Option<&T>, incoming: T) -> T {
    incoming
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    ticket: u64,
    trigger: FetchTrigger,
}

/// Lifecycle of one view's data, driven by [`SyncMsg`] values.
#[derive(Debug)]
pub struct Controller<P, T> {
    interval: Duration,
    policy: FailurePolicy,
    fallback: Option<T>,
    merge: MergeFn<T>,
    params: Option<P>,
    state: FetchState<T>,
    next_ticket: u64,
    in_flight: Option<InFlight>,
    mounted: bool,
    unmounted: bool,
    revision: u64,
}

impl<P, T> Controller<P, T>
where
    P: Clone + PartialEq,
    T: Clone,
{
    #[must_use]
    pub fn new(interval: Duration, policy: FailurePolicy) -> Self {
        Self {
            interval,
            policy,
            fallback: None,
            merge: replace::<T>,
            params: None,
            state: FetchState::default(),
            next_ticket: 0,
            in_flight: None,
            mounted: false,
            unmounted: false,
            revision: 0,
        }
    }

    /// Placeholder substituted under [`FailurePolicy::Fallback`]. Without one,
    /// failures surface as errors regardless of policy.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Option<T>) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn with_merge(mut self, merge: MergeFn<T>) -> Self {
        self.merge = merge;
        self
    }

    #[must_use]
    pub fn state(&self) -> &FetchState<T> {
        &self.state
    }

    #[must_use]
    pub fn params(&self) -> Option<&P> {
        self.params.as_ref()
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticket of the outstanding fetch, if any.
    #[must_use]
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight.map(|f| f.ticket)
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Bumped on every mutation of [`Self::state`].
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply one message and return the side-effects to execute.
    pub fn update(&mut self, msg: SyncMsg<P, T>) -> SyncCmd<P> {
        if self.unmounted {
            return SyncCmd::None;
        }
        match msg {
            SyncMsg::Mount(params) => self.mount(params),
            SyncMsg::Unmount => self.unmount(),
            _ if !self.mounted => SyncCmd::None,
            SyncMsg::Tick => self.tick(),
            SyncMsg::ManualRefresh => {
                let phase = self.busy_phase();
                self.set_phase(phase);
                self.issue(FetchTrigger::Manual)
            }
            SyncMsg::Revalidate => self.issue(FetchTrigger::Revalidate),
            SyncMsg::ParamsChanged(params) => self.params_changed(params),
            SyncMsg::FetchCompleted { ticket, result, at } => self.complete(ticket, result, at),
        }
    }

    fn mount(&mut self, params: P) -> SyncCmd<P> {
        if self.mounted {
            return SyncCmd::None;
        }
        self.mounted = true;
        self.params = Some(params);
        self.set_phase(FetchPhase::Loading);
        SyncCmd::Batch(vec![
            self.issue(FetchTrigger::Initial),
            SyncCmd::ArmTimer(self.interval),
        ])
    }

    fn unmount(&mut self) -> SyncCmd<P> {
        self.unmounted = true;
        self.mounted = false;
        self.in_flight = None;
        SyncCmd::Batch(vec![SyncCmd::CancelTimer, SyncCmd::CancelFetch])
    }

    fn tick(&mut self) -> SyncCmd<P> {
        // A fetch already outstanding will deliver fresher data than a new one.
        if self.in_flight.is_some() {
            return SyncCmd::None;
        }
        self.issue(FetchTrigger::Background)
    }

    fn params_changed(&mut self, params: P) -> SyncCmd<P> {
        if self.params.as_ref() == Some(&params) {
            return SyncCmd::None;
        }
        self.params = Some(params);
        let phase = self.busy_phase();
        self.set_phase(phase);
        SyncCmd::Batch(vec![
            self.issue(FetchTrigger::ParamsChanged),
            SyncCmd::ArmTimer(self.interval),
        ])
    }

    fn issue(&mut self, trigger: FetchTrigger) -> SyncCmd<P> {
        let Some(params) = self.params.clone() else {
            return SyncCmd::None;
        };
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.in_flight = Some(InFlight { ticket, trigger });
        SyncCmd::Batch(vec![
            SyncCmd::Fetch { ticket, params },
            SyncCmd::Note(SyncNote::Issued { ticket, trigger }),
        ])
    }

    fn complete(&mut self, ticket: u64, result: GatewayResult<T>, at: DateTime<Utc>) -> SyncCmd<P> {
        let Some(current) = self.in_flight.filter(|f| f.ticket == ticket) else {
            return SyncCmd::Note(SyncNote::Discarded { ticket });
        };
        self.in_flight = None;
        let trigger = current.trigger;

        match result {
            Ok(incoming) => {
                let previous = if self.state.placeholder {
                    None
                } else {
                    self.state.data.as_ref()
                };
                let merged = (self.merge)(previous, incoming);
                self.mutate(|s| {
                    s.data = Some(merged);
                    s.placeholder = false;
                    s.error = None;
                    s.last_error = None;
                    s.last_updated = Some(at);
                    s.phase = FetchPhase::Ready;
                });
                SyncCmd::Note(SyncNote::Applied { ticket, trigger })
            }
            Err(error) => {
                let surfaced = self.fail(&error);
                SyncCmd::Note(SyncNote::Failed {
                    ticket,
                    trigger,
                    error,
                    surfaced,
                })
            }
        }
    }

    /// Record a failure. Returns whether it was surfaced to the user.
    fn fail(&mut self, error: &GatewayError) -> bool {
        let message = error.message().to_owned();
        let visible = self.state.phase.is_busy() || self.state.data.is_none();

        if !visible {
            // Background failure over loaded data: keep showing it.
            self.mutate(|s| s.last_error = Some(message));
            return false;
        }

        let fallback = match self.policy {
            FailurePolicy::Fallback => self.fallback.clone(),
            FailurePolicy::Error => None,
        };
        match fallback {
            Some(placeholder) => {
                self.mutate(|s| {
                    if s.data.is_none() {
                        s.data = Some(placeholder);
                        s.placeholder = true;
                    }
                    s.last_error = Some(message);
                    s.error = None;
                    s.phase = FetchPhase::Ready;
                });
                false
            }
            None => {
                self.mutate(|s| {
                    s.error = Some(message.clone());
                    s.last_error = Some(message);
                    s.phase = FetchPhase::Errored;
                });
                true
            }
        }
    }

    /// Phase for a visible refetch: `Loading` until real data has arrived.
    fn busy_phase(&self) -> FetchPhase {
        if self.state.has_live_data() {
            FetchPhase::Refreshing
        } else {
            FetchPhase::Loading
        }
    }

    fn set_phase(&mut self, phase: FetchPhase) {
        if self.state.phase != phase {
            self.mutate(|s| s.phase = phase);
        }
    }

    fn mutate(&mut self, f: impl FnOnce(&mut FetchState<T>)) {
        f(&mut self.state);
        self.revision += 1;
    }
}
