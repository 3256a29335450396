//! The canonical event record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hashing::{canonical_doc_id, content_hash};

/// An append-only canonical event record.
///
/// Invariants (enforced by the storage layer, not by this type): the pair
/// `(source_system, source_event_id)` is unique whenever `source_event_id`
/// is non-null; records are never updated or deleted after insert;
/// `content_hash` is a pure function of `payload_json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// Monotonic id assigned by the store; `None` before insert.
    pub id: Option<i64>,
    pub source_system: String,
    pub source_event_id: Option<String>,
    pub event_time: Option<DateTime<Utc>>,
    /// Wall-clock UTC at append; server-assigned on insert when absent.
    pub ingest_time: Option<DateTime<Utc>>,
    pub payload_json: Value,
    pub content_hash: String,
    pub canonical_doc_id: Option<String>,
}

impl RawEvent {
    /// Builds a `RawEvent` with `content_hash` and the default
    /// `canonical_doc_id` derived from `payload_json`.
    /// Adapters needing a source-specific doc-id seed should overwrite
    /// `canonical_doc_id` after construction.
    pub fn new(
        source_system: impl Into<String>,
        source_event_id: Option<String>,
        event_time: Option<DateTime<Utc>>,
        payload_json: Value,
    ) -> Self {
        let source_system = source_system.into();
        let hash = content_hash(&payload_json);
        let doc_id = canonical_doc_id(&source_system, &hash);
        Self {
            id: None,
            source_system,
            source_event_id,
            event_time,
            ingest_time: None,
            payload_json,
            content_hash: hash,
            canonical_doc_id: Some(doc_id),
        }
    }
}

/// The alert family. Only `chain_progression` is produced today.
pub const ALERT_EVENT_TYPE_CHAIN_PROGRESSION: &str = "chain_progression";

/// Severity tier of an alert, determined by its chain score.
/// The empty string is a valid tier meaning "below reporting threshold".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    None,
    Low,
    Medium,
    High,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::None => "",
            Tier::Low => "low",
            Tier::Medium => "medium",
            Tier::High => "high",
        }
    }

    /// Tier boundaries are inclusive at the low end of each band.
    pub fn for_score(score: f64) -> Tier {
        if score >= 0.8 {
            Tier::High
        } else if score >= 0.5 {
            Tier::Medium
        } else if score >= 0.3 {
            Tier::Low
        } else {
            Tier::None
        }
    }
}

/// A graded alert with a stable identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Option<i64>,
    pub alert_id: String,
    pub tier: String,
    pub event_type: String,
    pub event_time: Option<DateTime<Utc>>,
    pub ingest_time: Option<DateTime<Utc>>,
    pub company_id: Option<String>,
    pub asset_id: Option<String>,
    pub canonical_doc_id: String,
    pub evidence_pointer: Value,
    pub score_summary: Value,
    pub summary: String,
    pub details: Value,
    pub regime_context: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_event_round_trips_through_json() {
        let event = RawEvent::new("alaska_permits", Some("abc".into()), None, json!({"a": 1}));
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: RawEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.content_hash, event.content_hash);
        assert_eq!(decoded.source_system, "alaska_permits");
    }

    #[test]
    fn tier_ordering_matches_rank() {
        assert!(Tier::None < Tier::Low);
        assert!(Tier::Low < Tier::Medium);
        assert!(Tier::Medium < Tier::High);
    }

    #[test]
    fn tier_for_score_boundaries() {
        assert_eq!(Tier::for_score(0.8).as_str(), "high");
        assert_eq!(Tier::for_score(0.5).as_str(), "medium");
        assert_eq!(Tier::for_score(0.3).as_str(), "low");
        assert_eq!(Tier::for_score(0.29).as_str(), "");
    }
}
