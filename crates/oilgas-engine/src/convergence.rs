//! The convergence engine: cross-source categorical signal
//! aggregation over a rolling time window.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use oilgas_types::{normalize_text, RawEvent};

use crate::chain::ChainRow;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::A => "A",
            Category::B => "B",
            Category::C => "C",
            Category::D => "D",
            Category::E => "E",
            Category::F => "F",
        }
    }
}

/// Maps a canonical event type to exactly one signal category, or `None`
/// when the type contributes to no category.
pub fn category_for_type(event_type: &str) -> Option<Category> {
    match event_type {
        "permit_filed" | "permit_issued" | "drilling_permit" | "claims_staked" | "exploration_permit" => Some(Category::A),
        "spud_reported" | "well_record" | "completion_reported" | "well_completion" | "drill_result" | "drill_assay" => Some(Category::B),
        "resource_estimate" | "feasibility_study" => Some(Category::C),
        "deal_announced" | "financing_closed" | "offtake_agreement" => Some(Category::D),
        "insider_buy" | "institutional_13g" | "institutional_13f" => Some(Category::E),
        // REE/U lifecycle policy events, plus the canonical types the
        // federal_register_rules and nprm_congressional adapters actually
        // emit (rule_published/rule_finalized/proposed_rule/bill_introduced
        // are legacy aliases kept for upstream fixtures using those names).
        "policy_designation"
        | "policy_final_rule"
        | "policy_nprm_open"
        | "policy_comment_deadline"
        | "congressional_trade_disclosure"
        | "legislation_committee_advance"
        | "rule_published"
        | "rule_finalized"
        | "proposed_rule"
        | "bill_introduced"
        | "congressional_disclosure" => Some(Category::F),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct Signal {
    time: DateTime<Utc>,
    category: Category,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvergenceResult {
    pub convergence_score: usize,
    pub convergence_categories: Vec<String>,
}

/// Builds a key-indexed signal index from every event.
fn build_signal_index(events: &[RawEvent]) -> BTreeMap<String, Vec<Signal>> {
    let mut index: BTreeMap<String, Vec<Signal>> = BTreeMap::new();

    for event in events {
        let Some(time) = event.event_time else { continue };
        let payload = &event.payload_json;
        let Some(event_type) = payload.get("type").and_then(Value::as_str) else { continue };
        let Some(category) = category_for_type(event_type) else { continue };

        let mut keys = Vec::new();
        if let Some(lineage_id) = payload.get("lineage_id").and_then(Value::as_str) {
            keys.push(format!("lineage:{lineage_id}"));
        }
        if let Some(company_id) = payload.get("company_id").and_then(Value::as_str) {
            keys.push(format!("company_id:{company_id}"));
        }
        let name = payload
            .get("company")
            .and_then(Value::as_str)
            .or_else(|| payload.get("operator").and_then(Value::as_str));
        if let Some(name) = name {
            let normalized = normalize_text(name);
            if !normalized.is_empty() {
                keys.push(format!("company_name:{normalized}"));
            }
        }

        for key in keys {
            index.entry(key).or_default().push(Signal { time, category });
        }
    }

    index
}

/// Computes the convergence result for one chain row, given the full
/// signal index built from the event set the row was derived from.
fn convergence_for_row(row: &ChainRow, index: &BTreeMap<String, Vec<Signal>>, window: Duration) -> ConvergenceResult {
    let keys = row_keys(row);

    let anchor = keys
        .iter()
        .filter_map(|key| index.get(key))
        .flat_map(|signals| signals.iter().map(|s| s.time))
        .chain(row.last_event_time)
        .max();

    let Some(anchor) = anchor else {
        return ConvergenceResult::default();
    };
    let window_start = anchor - window;

    let mut categories: BTreeSet<Category> = BTreeSet::new();
    for key in &keys {
        if let Some(signals) = index.get(key) {
            for signal in signals {
                if signal.time >= window_start && signal.time <= anchor {
                    categories.insert(signal.category);
                }
            }
        }
    }

    ConvergenceResult {
        convergence_score: categories.len(),
        convergence_categories: categories.iter().map(|c| c.label().to_string()).collect(),
    }
}

fn row_keys(row: &ChainRow) -> Vec<String> {
    let mut keys = vec![format!("lineage:{}", row.lineage_id)];
    if let Some(company_id) = &row.context.company_id {
        keys.push(format!("company_id:{company_id}"));
    }
    let name = row.context.company.as_deref().or(row.context.operator.as_deref());
    if let Some(name) = name {
        let normalized = normalize_text(name);
        if !normalized.is_empty() {
            keys.push(format!("company_name:{normalized}"));
        }
    }
    keys
}

/// Enriches every chain row with its convergence result, using `events`
/// (the same set `compute_chain_scores` consumed) to build the signal
/// index and a `window` defaulting to 30 days.
pub fn enrich_with_convergence(rows: &[ChainRow], events: &[RawEvent], window_days: i64) -> Vec<(ChainRow, ConvergenceResult)> {
    let index = build_signal_index(events);
    let window = Duration::days(window_days);
    rows.iter().map(|row| (row.clone(), convergence_for_row(row, &index, window))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::compute_chain_scores;
    use serde_json::json;

    #[test]
    fn federal_register_and_nprm_canonical_types_map_to_category_f() {
        for event_type in [
            "policy_final_rule",
            "policy_nprm_open",
            "policy_comment_deadline",
            "congressional_trade_disclosure",
            "legislation_committee_advance",
        ] {
            assert_eq!(category_for_type(event_type), Some(Category::F), "{event_type} should map to category F");
        }
    }

    fn event(event_type: &str, time: &str, extra: Value) -> RawEvent {
        let mut payload = json!({"type": event_type});
        if let (Value::Object(extra_map), Value::Object(payload_map)) = (extra, &mut payload) {
            payload_map.extend(extra_map);
        }
        let mut evt = RawEvent::new("test", None, Some(time.parse().unwrap()), payload);
        evt.event_time = Some(time.parse().unwrap());
        evt
    }

    #[test]
    fn cross_source_convergence_reaches_five_categories() {
        let lineage = "TX:CONVERGE";
        let events = vec![
            event("permit_issued", "2026-01-01T00:00:00Z", json!({"lineage_id": lineage, "region": "texas", "company": "Acme"})),
            event("drill_result", "2026-01-05T00:00:00Z", json!({"lineage_id": lineage, "region": "texas", "company": "Acme"})),
            event("insider_buy", "2026-01-10T00:00:00Z", json!({"company": "Acme", "filer_name": "Dana Morgan"})),
            event("financing_closed", "2026-01-15T00:00:00Z", json!({"company": "Acme"})),
            event("policy_designation", "2026-01-20T00:00:00Z", json!({"company": "Acme"})),
        ];
        let rows = compute_chain_scores(&events);
        let enriched = enrich_with_convergence(&rows, &events, DEFAULT_WINDOW_DAYS);
        let (_, convergence) = enriched.iter().find(|(row, _)| row.lineage_id == lineage).unwrap();
        assert!(convergence.convergence_score >= 5);
        for label in ["A", "B", "D", "E", "F"] {
            assert!(convergence.convergence_categories.contains(&label.to_string()));
        }
    }

    #[test]
    fn convergence_window_boundaries_are_inclusive_at_anchor() {
        let lineage = "TX:WINDOW";
        let base = event("permit_issued", "2026-02-01T00:00:00Z", json!({"lineage_id": lineage, "region": "texas"}));
        let exactly_at_edge = event("drill_result", "2026-01-02T00:00:00Z", json!({"lineage_id": lineage, "region": "texas"}));
        let strictly_before = event("insider_buy", "2026-01-01T23:59:59Z", json!({"lineage_id": lineage, "filer_name": "X"}));
        // `strictly_before` carries the same lineage_id as `base` so it is
        // indexed under the row's own key; it falls one second outside the
        // window and must be excluded regardless.

        let events = vec![base, exactly_at_edge, strictly_before];
        let rows = compute_chain_scores(&events);
        let enriched = enrich_with_convergence(&rows, &events, DEFAULT_WINDOW_DAYS);
        let (_, convergence) = &enriched[0];

        assert!(convergence.convergence_categories.contains(&"B".to_string()));
        assert!(!convergence.convergence_categories.contains(&"E".to_string()));
    }
}
