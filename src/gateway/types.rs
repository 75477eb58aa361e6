//! Typed wire schema for the monitoring service.
//!
//! Every response body is decoded into one of these structs and then passed
//! through [`Validate`]; a body that fails either step becomes a
//! `Malformed` gateway error instead of leaking partially-typed data upward.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ──────────────────── enums ────────────────────

/// Lifecycle status of a CI failure event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Detected,
    Analyzing,
    Fixing,
    Fixed,
    Failed,
}

impl EventStatus {
    pub const ALL: [Self; 5] = [
        Self::Detected,
        Self::Analyzing,
        Self::Fixing,
        Self::Fixed,
        Self::Failed,
    ];

    /// Wire label, also used in the shareable query string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Detected => "DETECTED",
            Self::Analyzing => "ANALYZING",
            Self::Fixing => "FIXING",
            Self::Fixed => "FIXED",
            Self::Failed => "FAILED",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

/// Outcome of a single fix attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixStatus {
    Success,
    Failed,
    Pending,
}

/// Coarse confidence band used by the fixes filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfidenceBucket {
    /// `>= 0.9`
    High,
    /// `0.7 ..< 0.9`
    Medium,
    /// `< 0.7`
    Low,
}

impl ConfidenceBucket {
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    #[must_use]
    pub fn from_score(confidence: f64) -> Self {
        if confidence >= 0.9 {
            Self::High
        } else if confidence >= 0.7 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == raw)
    }
}

// ──────────────────── records ────────────────────

/// A CI/CD failure event with its fix attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub repo_full_name: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub branch: String,
    pub commit_sha: String,
    pub status: EventStatus,
    pub error_type: String,
    pub error_message: String,
    pub file_path: String,
    pub line_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub fix_attempts: Vec<FixAttempt>,
}

/// Parent event summary embedded in fix listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixEventRef {
    pub repo_full_name: String,
    pub branch: String,
    pub error_type: String,
}

/// One AI-generated fix attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixAttempt {
    pub id: String,
    pub failure_event_id: String,
    pub original_code: String,
    pub fixed_code: String,
    pub diff_summary: String,
    pub confidence: f64,
    pub status: FixStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_event: Option<FixEventRef>,
}

impl FixAttempt {
    #[must_use]
    pub fn confidence_bucket(&self) -> ConfidenceBucket {
        ConfidenceBucket::from_score(self.confidence)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCount {
    pub repo: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

/// Aggregate dashboard statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_events: u64,
    pub fixed_events: u64,
    pub failed_events: u64,
    pub pending_events: u64,
    pub success_rate: f64,
    pub recent_events: Vec<Event>,
    pub top_repos: Vec<RepoCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_over_time: Option<Vec<DailyCount>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

/// A job that exhausted its attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedJob {
    pub id: String,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    pub failed_reason: String,
    pub attempts_made: u32,
}

/// Work-queue counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub counts: QueueCounts,
    pub active: u64,
    pub waiting: u64,
    pub failed: u64,
    #[serde(default)]
    pub recent_failed: Vec<FailedJob>,
}

/// Server-side pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

impl Pagination {
    /// Metadata for a page that holds nothing.
    #[must_use]
    pub const fn empty(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            total: 0,
            pages: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixPage {
    pub fixes: Vec<FixAttempt>,
    pub pagination: Pagination,
}

/// Reply to `POST /api/queue/retry-failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOutcome {
    pub message: String,
    #[serde(default, alias = "affectedIds")]
    pub job_ids: Vec<String>,
}

/// Reply to `POST /api/queue/clean`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOutcome {
    pub message: String,
}

/// Reply to `GET /webhooks/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: String,
}

/// Reply to `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub status: String,
}

// ──────────────────── request parameters ────────────────────

/// Parameters for `GET /api/events`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub page: u32,
    pub limit: u32,
    pub status: Option<EventStatus>,
    pub repo: Option<String>,
}

impl EventQuery {
    /// Query-string pairs; absent filters are omitted.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_owned()));
        }
        if let Some(repo) = &self.repo {
            pairs.push(("repo", repo.clone()));
        }
        pairs
    }
}

/// Parameters for `GET /api/fixes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixQuery {
    pub page: u32,
    pub limit: u32,
}

impl FixQuery {
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

// ──────────────────── validation ────────────────────

/// Semantic checks applied after a body decodes.
pub trait Validate {
    /// Returns a description of the first violated constraint.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl Validate for Pagination {
    fn validate(&self) -> Result<(), String> {
        if self.page == 0 {
            return Err("pagination.page must be >= 1".to_owned());
        }
        if self.limit == 0 {
            return Err("pagination.limit must be >= 1".to_owned());
        }
        Ok(())
    }
}

impl Validate for FixAttempt {
    fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "fix {} confidence {} outside 0..=1",
                self.id, self.confidence
            ));
        }
        Ok(())
    }
}

impl Validate for Event {
    fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("event id is empty".to_owned());
        }
        self.fix_attempts.iter().try_for_each(Validate::validate)
    }
}

impl Validate for EventPage {
    fn validate(&self) -> Result<(), String> {
        self.pagination.validate()?;
        self.events.iter().try_for_each(Validate::validate)
    }
}

impl Validate for FixPage {
    fn validate(&self) -> Result<(), String> {
        self.pagination.validate()?;
        self.fixes.iter().try_for_each(Validate::validate)
    }
}

impl Validate for Stats {
    fn validate(&self) -> Result<(), String> {
        if !self.success_rate.is_finite() || self.success_rate < 0.0 {
            return Err(format!("successRate {} is invalid", self.success_rate));
        }
        self.recent_events.iter().try_for_each(Validate::validate)
    }
}

impl Validate for QueueStats {}
impl Validate for RetryOutcome {}
impl Validate for PurgeOutcome {}
impl Validate for HealthReport {}
impl Validate for ServerInfo {}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT_JSON: &str = r#"{
        "id": "evt-1",
        "repoFullName": "acme/frontend",
        "repoOwner": "acme",
        "repoName": "frontend",
        "branch": "main",
        "commitSha": "abc123",
        "status": "FIXED",
        "errorType": "SyntaxError",
        "errorMessage": "Unexpected token",
        "filePath": "src/index.ts",
        "lineNumber": 42,
        "confidence": 0.95,
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-01-01T00:05:00Z",
        "fixAttempts": []
    }"#;

    #[test]
    fn event_decodes_from_camel_case() {
        let event: Event = serde_json::from_str(EVENT_JSON).unwrap();
        assert_eq!(event.repo_full_name, "acme/frontend");
        assert_eq!(event.status, EventStatus::Fixed);
        assert_eq!(event.line_number, 42);
        assert!(event.pr_url.is_none());
        assert!(event.validate().is_ok());
    }

    #[test]
    fn event_with_unknown_status_is_rejected() {
        let bad = EVENT_JSON.replace("\"FIXED\"", "\"EXPLODED\"");
        assert!(serde_json::from_str::<Event>(&bad).is_err());
    }

    #[test]
    fn event_missing_required_field_is_rejected() {
        let bad = EVENT_JSON.replace("\"commitSha\": \"abc123\",", "");
        assert!(serde_json::from_str::<Event>(&bad).is_err());
    }

    #[test]
    fn confidence_buckets_match_thresholds() {
        assert_eq!(ConfidenceBucket::from_score(0.95), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::from_score(0.9), ConfidenceBucket::High);
        assert_eq!(ConfidenceBucket::from_score(0.89), ConfidenceBucket::Medium);
        assert_eq!(ConfidenceBucket::from_score(0.7), ConfidenceBucket::Medium);
        assert_eq!(ConfidenceBucket::from_score(0.69), ConfidenceBucket::Low);
    }

    #[test]
    fn status_labels_parse_back() {
        for status in EventStatus::ALL {
            assert_eq!(EventStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EventStatus::parse("fixed"), None);
    }

    #[test]
    fn event_query_omits_absent_filters() {
        let q = EventQuery {
            page: 2,
            limit: 10,
            status: None,
            repo: None,
        };
        let keys: Vec<_> = q.to_pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["page", "limit"]);

        let q = EventQuery {
            status: Some(EventStatus::Failed),
            repo: Some("acme/api".to_owned()),
            ..q
        };
        assert!(q.to_pairs().contains(&("status", "FAILED".to_owned())));
        assert!(q.to_pairs().contains(&("repo", "acme/api".to_owned())));
    }

    #[test]
    fn pagination_rejects_zero_page() {
        let p = Pagination {
            page: 0,
            limit: 10,
            total: 0,
            pages: 0,
        };
        assert!(p.validate().is_err());
        assert!(Pagination::empty(10).validate().is_ok());
    }

    #[test]
    fn retry_outcome_accepts_either_id_key() {
        let a: RetryOutcome =
            serde_json::from_str(r#"{"message":"ok","jobIds":["1","2"]}"#).unwrap();
        let b: RetryOutcome =
            serde_json::from_str(r#"{"message":"ok","affectedIds":["1","2"]}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fix_confidence_out_of_range_fails_validation() {
        let fix: FixAttempt = serde_json::from_str(
            r#"{
                "id": "fix-1",
                "failureEventId": "evt-1",
                "originalCode": "a",
                "fixedCode": "b",
                "diffSummary": "c",
                "confidence": 1.5,
                "status": "success",
                "createdAt": "2026-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();
        assert!(fix.validate().is_err());
    }
}
