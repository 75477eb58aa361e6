//! Keeps a view's [`QueryState`] and its persisted address in lockstep.
//!
//! Every setter writes the full state back to the [`Location`] immediately.
//! Filter setters reset the page to 1. Observers (the view's fetch loop)
//! receive new states through a `watch` channel and refetch on change.

#![allow(missing_docs)]

use tokio::sync::watch;

use super::{ConfidenceFilter, QueryMap, QueryState, StatusFilter};

/// Where the query mapping is persisted (an address bar, a state file, ...).
pub trait Location {
    fn read(&self) -> QueryMap;
    fn write(&mut self, map: QueryMap);
}

/// In-memory location; records how many writes it received.
#[derive(Debug, Default, Clone)]
pub struct MemoryLocation {
    map: QueryMap,
    writes: usize,
}

impl MemoryLocation {
    #[must_use]
    pub fn from_query_string(raw: &str) -> Self {
        Self {
            map: super::parse_query_string(raw),
            writes: 0,
        }
    }

    #[must_use]
    pub fn map(&self) -> &QueryMap {
        &self.map
    }

    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Location for MemoryLocation {
    fn read(&self) -> QueryMap {
        self.map.clone()
    }

    fn write(&mut self, map: QueryMap) {
        self.map = map;
        self.writes += 1;
    }
}

/// Owner of one view's filter and pagination state.
pub struct QuerySync<L: Location> {
    state: QueryState,
    location: L,
    tx: watch::Sender<QueryState>,
}

impl<L: Location> QuerySync<L> {
    /// Hydrate from the location. Missing or invalid keys take defaults.
    pub fn mount(location: L) -> Self {
        let state = QueryState::decode(&location.read());
        let (tx, _rx) = watch::channel(state.clone());
        Self {
            state,
            location,
            tx,
        }
    }

    #[must_use]
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    #[must_use]
    pub fn location(&self) -> &L {
        &self.location
    }

    /// Receiver that observes every committed state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.tx.subscribe()
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        let next = QueryState {
            page: 1,
            search: text.into(),
            ..self.state.clone()
        };
        self.commit(next);
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        let next = QueryState {
            page: 1,
            status,
            ..self.state.clone()
        };
        self.commit(next);
    }

    pub fn set_confidence_filter(&mut self, confidence: ConfidenceFilter) {
        let next = QueryState {
            page: 1,
            confidence,
            ..self.state.clone()
        };
        self.commit(next);
    }

    /// Pages below 1 are raised to 1.
    pub fn set_page(&mut self, page: u32) {
        let next = QueryState {
            page: page.max(1),
            ..self.state.clone()
        };
        self.commit(next);
    }

    /// Replace the state wholesale, e.g. after the address changed externally.
    pub fn reload(&mut self) {
        let next = QueryState::decode(&self.location.read());
        self.commit(next);
    }

    fn commit(&mut self, next: QueryState) {
        self.location.write(next.encode());
        self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        self.state = next;
    }
}
