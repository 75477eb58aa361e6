//! User-adjustable filter and pagination state and its shareable form.
//!
//! [`QueryState`] round-trips through a flat string mapping ([`QueryMap`])
//! carried in the view's address: keys `page`, `status`, `confidence`,
//! `repo`. Absent or unparseable keys fall back to defaults, and
//! `decode(&encode(q)) == q` holds for every state with `page >= 1`.

#![allow(missing_docs)]

pub mod sync;

use std::collections::BTreeMap;

use url::form_urlencoded;

use crate::gateway::types::{ConfidenceBucket, EventStatus};

/// Flat key/value representation persisted in the view's address.
pub type QueryMap = BTreeMap<String, String>;

pub const KEY_PAGE: &str = "page";
pub const KEY_STATUS: &str = "status";
pub const KEY_CONFIDENCE: &str = "confidence";
pub const KEY_REPO: &str = "repo";

const ALL: &str = "ALL";

/// Event status filter; `All` disables filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    #[default]
    All,
    Only(EventStatus),
}

impl StatusFilter {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => ALL,
            Self::Only(status) => status.as_str(),
        }
    }

    /// Unknown labels decode as `All`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        EventStatus::parse(raw).map_or(Self::All, Self::Only)
    }

    #[must_use]
    pub fn status(self) -> Option<EventStatus> {
        match self {
            Self::All => None,
            Self::Only(status) => Some(status),
        }
    }
}

/// Fix confidence filter; `All` disables filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConfidenceFilter {
    #[default]
    All,
    Only(ConfidenceBucket),
}

impl ConfidenceFilter {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => ALL,
            Self::Only(bucket) => bucket.as_str(),
        }
    }

    /// Unknown labels decode as `All`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        ConfidenceBucket::parse(raw).map_or(Self::All, Self::Only)
    }

    #[must_use]
    pub fn matches(self, confidence: f64) -> bool {
        match self {
            Self::All => true,
            Self::Only(bucket) => ConfidenceBucket::from_score(confidence) == bucket,
        }
    }
}

/// Filter and pagination parameters of one mounted view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryState {
    /// 1-based page number.
    pub page: u32,
    pub status: StatusFilter,
    pub confidence: ConfidenceFilter,
    /// Free-text repository search, sent as `repo`.
    pub search: String,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            page: 1,
            status: StatusFilter::All,
            confidence: ConfidenceFilter::All,
            search: String::new(),
        }
    }
}

impl QueryState {
    /// Full mapping for the persisted representation.
    ///
    /// `repo` is omitted when the search text is empty; it decodes back to
    /// the same empty default.
    #[must_use]
    pub fn encode(&self) -> QueryMap {
        let mut map = QueryMap::new();
        map.insert(KEY_PAGE.to_owned(), self.page.to_string());
        map.insert(KEY_STATUS.to_owned(), self.status.as_str().to_owned());
        map.insert(
            KEY_CONFIDENCE.to_owned(),
            self.confidence.as_str().to_owned(),
        );
        if !self.search.is_empty() {
            map.insert(KEY_REPO.to_owned(), self.search.clone());
        }
        map
    }

    /// Rebuild state from a mapping, defaulting anything missing or invalid.
    #[must_use]
    pub fn decode(map: &QueryMap) -> Self {
        let page = map
            .get(KEY_PAGE)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1);
        Self {
            page,
            status: map
                .get(KEY_STATUS)
                .map_or(StatusFilter::All, |raw| StatusFilter::parse(raw)),
            confidence: map
                .get(KEY_CONFIDENCE)
                .map_or(ConfidenceFilter::All, |raw| ConfidenceFilter::parse(raw)),
            search: map.get(KEY_REPO).cloned().unwrap_or_default(),
        }
    }

    /// Shareable `key=value&...` form of [`Self::encode`].
    #[must_use]
    pub fn to_query_string(&self) -> String {
        encode_query_string(&self.encode())
    }

    /// Parse a `?key=value&...` string (leading `?` optional).
    #[must_use]
    pub fn from_query_string(raw: &str) -> Self {
        Self::decode(&parse_query_string(raw))
    }
}

/// Form-encode a mapping in key order.
#[must_use]
pub fn encode_query_string(map: &QueryMap) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(map.iter())
        .finish()
}

/// Decode a query string. The first occurrence of a repeated key wins.
#[must_use]
pub fn parse_query_string(raw: &str) -> QueryMap {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut map = QueryMap::new();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        map.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    map
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn empty_mapping_decodes_to_defaults() {
        assert_eq!(QueryState::decode(&QueryMap::new()), QueryState::default());
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let state = QueryState::from_query_string("page=abc&status=EXPLODED&confidence=huge");
        assert_eq!(state, QueryState::default());

        let state = QueryState::from_query_string("page=0");
        assert_eq!(state.page, 1);
    }

    #[test]
    fn query_string_decodes_all_keys() {
        let state =
            QueryState::from_query_string("?page=3&status=FAILED&confidence=HIGH&repo=acme%2Fapi");
        assert_eq!(state.page, 3);
        assert_eq!(state.status, StatusFilter::Only(EventStatus::Failed));
        assert_eq!(state.confidence, ConfidenceFilter::Only(ConfidenceBucket::High));
        assert_eq!(state.search, "acme/api");
    }

    #[test]
    fn encode_writes_every_filter_key() {
        let map = QueryState::default().encode();
        assert_eq!(map.get(KEY_PAGE).map(String::as_str), Some("1"));
        assert_eq!(map.get(KEY_STATUS).map(String::as_str), Some("ALL"));
        assert_eq!(map.get(KEY_CONFIDENCE).map(String::as_str), Some("ALL"));
        assert!(!map.contains_key(KEY_REPO));
    }

    #[test]
    fn repeated_keys_keep_first_value() {
        let map = parse_query_string("page=2&page=9");
        assert_eq!(map.get(KEY_PAGE).map(String::as_str), Some("2"));
    }

    #[test]
    fn confidence_filter_matches_buckets() {
        let high = ConfidenceFilter::Only(ConfidenceBucket::High);
        assert!(high.matches(0.95));
        assert!(!high.matches(0.85));
        assert!(ConfidenceFilter::All.matches(0.1));
    }

    fn arb_status() -> impl Strategy<Value = StatusFilter> {
        prop_oneof![
            Just(StatusFilter::All),
            proptest::sample::select(EventStatus::ALL.to_vec()).prop_map(StatusFilter::Only),
        ]
    }

    fn arb_confidence() -> impl Strategy<Value = ConfidenceFilter> {
        prop_oneof![
            Just(ConfidenceFilter::All),
            proptest::sample::select(ConfidenceBucket::ALL.to_vec())
                .prop_map(ConfidenceFilter::Only),
        ]
    }

    fn arb_state() -> impl Strategy<Value = QueryState> {
        (1u32..10_000, arb_status(), arb_confidence(), ".{0,24}").prop_map(
            |(page, status, confidence, search)| QueryState {
                page,
                status,
                confidence,
                search,
            },
        )
    }

    proptest! {
        #[test]
        fn state_round_trips_through_mapping_and_query_string(state in arb_state()) {
            prop_assert_eq!(&QueryState::decode(&state.encode()), &state);
            prop_assert_eq!(&QueryState::from_query_string(&state.to_query_string()), &state);
        }
    }
}
