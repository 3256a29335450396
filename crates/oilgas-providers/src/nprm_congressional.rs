//! Proposed-rule notices and congressional/legislative disclosures.
//!
//! Four event types share this source because they're all early-signal
//! policy events that precede a `federal_register_rules::policy_final_rule`.
//! `lineage_id` tries `company_id`, `company`, `bill_id`, then `docket_id` —
//! `bill_id` is tried *before* `docket_id` here, though it rarely matters
//! once a `company_id` is present.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use oilgas_types::{canonical_doc_id_from_seed, coerce_datetime_value, sha_hex_prefix};
use oilgas_universe::{resolve_company, Universe};

use crate::common::{clean_str, clean_value, normalize_tickers};
use crate::traits::SourceAdapter;

pub const SOURCE_SYSTEM: &str = "nprm_congressional";

static TYPE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("policy_nprm_open", "policy_nprm_open"),
        ("nprm_open", "policy_nprm_open"),
        ("nprm", "policy_nprm_open"),
        ("policy_comment_deadline", "policy_comment_deadline"),
        ("comment_deadline", "policy_comment_deadline"),
        ("public_comment_deadline", "policy_comment_deadline"),
        ("congressional_trade_disclosure", "congressional_trade_disclosure"),
        ("congressional_trade", "congressional_trade_disclosure"),
        ("house_trade_disclosure", "congressional_trade_disclosure"),
        ("legislation_committee_advance", "legislation_committee_advance"),
        ("committee_advance", "legislation_committee_advance"),
        ("bill_committee_advance", "legislation_committee_advance"),
    ])
});

static IMPACT_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("favorable", "favorable"),
        ("positive", "favorable"),
        ("bullish", "favorable"),
        ("adverse", "adverse"),
        ("negative", "adverse"),
        ("bearish", "adverse"),
        ("neutral", "neutral"),
        ("mixed", "mixed"),
    ])
});

fn normalize_type(raw: Option<&str>) -> String {
    let key = match raw {
        Some(s) if !s.trim().is_empty() => s.trim().to_lowercase().replace([' ', '-'], "_"),
        _ => return "unknown".to_string(),
    };
    TYPE_ALIASES.get(key.as_str()).map(|s| s.to_string()).unwrap_or(key)
}

fn normalize_impact(raw: Option<&str>) -> Option<String> {
    let key = clean_str(raw?)?.to_lowercase();
    Some(IMPACT_ALIASES.get(key.as_str()).map(|s| s.to_string()).unwrap_or(key))
}

fn derive_lineage_id(payload: &Value) -> Option<String> {
    if let Some(company_id) = payload.get("company_id").and_then(Value::as_str).and_then(clean_str) {
        return Some(format!("POLICY:{company_id}"));
    }
    if let Some(company) = payload.get("company").and_then(Value::as_str).and_then(clean_str) {
        return Some(format!("POLICY:{}", sha_hex_prefix(&company.to_lowercase(), 16)));
    }
    if let Some(bill_id) = payload.get("bill_id").and_then(Value::as_str).and_then(clean_str) {
        return Some(format!("POLICY:{}", sha_hex_prefix(&bill_id.to_lowercase(), 16)));
    }
    if let Some(docket_id) = payload.get("docket_id").and_then(Value::as_str).and_then(clean_str) {
        return Some(format!("POLICY:{}", sha_hex_prefix(&docket_id.to_lowercase(), 16)));
    }
    None
}

pub struct NprmCongressionalAdapter<'u> {
    universe: &'u Universe,
}

impl<'u> NprmCongressionalAdapter<'u> {
    pub fn new(universe: &'u Universe) -> Self {
        Self { universe }
    }
}

impl<'u> SourceAdapter for NprmCongressionalAdapter<'u> {
    fn source_system(&self) -> &'static str {
        SOURCE_SYSTEM
    }

    fn canonicalize(&self, payload: Value) -> Value {
        let mut p = match payload {
            Value::Object(map) => map,
            _ => Default::default(),
        };

        p.insert("type".into(), json!(normalize_type(p.get("type").and_then(Value::as_str))));
        p.insert("title".into(), json!(clean_value(p.get("title"))));
        p.insert("agency".into(), json!(clean_value(p.get("agency"))));
        p.insert("docket_id".into(), json!(clean_value(p.get("docket_id"))));
        p.insert("bill_id".into(), json!(clean_value(p.get("bill_id"))));
        p.insert("committee".into(), json!(clean_value(p.get("committee"))));
        p.insert("legislator".into(), json!(clean_value(p.get("legislator"))));
        p.insert("trade_action".into(), json!(clean_value(p.get("trade_action"))));
        p.insert("impact_direction".into(), json!(normalize_impact(p.get("impact_direction").and_then(Value::as_str))));
        p.insert("impact_summary".into(), json!(clean_value(p.get("impact_summary"))));
        p.insert("comment_deadline".into(), json!(clean_value(p.get("comment_deadline"))));
        p.insert("company".into(), json!(clean_value(p.get("company"))));
        p.insert("tickers".into(), json!(normalize_tickers(p.get("tickers"))));
        p.insert("source_url".into(), json!(clean_value(p.get("source_url"))));
        p.insert("region".into(), json!(clean_value(p.get("region")).unwrap_or_else(|| "US".to_string())));

        if let Some(company) = p.get("company").and_then(Value::as_str) {
            let resolution = resolve_company(self.universe, Some(company), None);
            if let Some(company_id) = resolution.company_id {
                p.insert("company_id".into(), json!(company_id));
                let tickers_empty = p.get("tickers").map(|v| v.as_array().is_some_and(Vec::is_empty)).unwrap_or(true);
                if tickers_empty {
                    if let Some(company) = self.universe.companies.iter().find(|c| c.name == *company) {
                        p.insert("tickers".into(), json!(company.tickers));
                    }
                }
            }
        }

        let payload = Value::Object(p);
        let lineage = derive_lineage_id(&payload);
        let mut p = match payload {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        if let Some(lineage) = lineage {
            p.insert("lineage_id".into(), json!(lineage));
        }
        Value::Object(p)
    }

    fn event_time(&self, payload: &Value) -> Option<DateTime<Utc>> {
        coerce_datetime_value(payload.get("event_time"))
            .or_else(|| coerce_datetime_value(payload.get("comment_deadline")))
    }

    fn source_event_id(&self, envelope: &Value, payload: &Value) -> String {
        if let Some(explicit) = envelope.get("source_event_id").and_then(Value::as_str).and_then(clean_str) {
            return explicit;
        }
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or("");
        let docket_id = payload.get("docket_id").and_then(Value::as_str).unwrap_or("");
        let bill_id = payload.get("bill_id").and_then(Value::as_str).unwrap_or("");
        let company = payload.get("company").and_then(Value::as_str).unwrap_or("");
        let legislator = payload.get("legislator").and_then(Value::as_str).unwrap_or("");
        let seed = format!("{event_type}|{docket_id}|{bill_id}|{company}|{legislator}");
        format!("pol_{}", sha_hex_prefix(&seed, 24))
    }

    fn canonical_doc_id(&self, source_event_id: &str, payload: &Value) -> String {
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or("");
        let bill_id = payload.get("bill_id").and_then(Value::as_str).unwrap_or("");
        let docket_id = payload.get("docket_id").and_then(Value::as_str).unwrap_or("");
        let seed = format!("{source_event_id}|{event_type}|{bill_id}|{docket_id}");
        canonical_doc_id_from_seed(SOURCE_SYSTEM, &seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_nprm_to_policy_nprm_open() {
        let universe = Universe::empty();
        let adapter = NprmCongressionalAdapter::new(&universe);
        let payload = adapter.canonicalize(json!({"type": "nprm"}));
        assert_eq!(payload["type"], "policy_nprm_open");
    }

    #[test]
    fn event_time_falls_back_to_comment_deadline() {
        let universe = Universe::empty();
        let adapter = NprmCongressionalAdapter::new(&universe);
        let payload = adapter.canonicalize(json!({"comment_deadline": "2026-03-01"}));
        assert!(adapter.event_time(&payload).is_some());
    }

    #[test]
    fn lineage_tries_bill_before_docket() {
        let universe = Universe::empty();
        let adapter = NprmCongressionalAdapter::new(&universe);
        let payload = adapter.canonicalize(json!({"bill_id": "HR-1234", "docket_id": "EPA-1"}));
        let expected = format!("POLICY:{}", sha_hex_prefix(&"hr-1234".to_string(), 16));
        assert_eq!(payload["lineage_id"], expected);
    }
}
