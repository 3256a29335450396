//! Texas Railroad Commission well-lifecycle records.
//!
//! Two things make this source distinct from the others: `lineage_id`
//! prefers the API number over any
//! hash (`"TX:{api}"`), and `source_event_id` is a literal `"{api}|{type}"`
//! concatenation rather than a hash — the RRC's own identifiers are
//! already unique, so there's nothing to hash.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use oilgas_types::{canonical_doc_id_from_seed, coerce_datetime_value, coerce_number};

use crate::common::clean_str;
use crate::traits::SourceAdapter;

pub const SOURCE_SYSTEM: &str = "tx_rrc";

static TYPE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("permit_filed", "permit_filed"),
        ("permit_issued", "permit_issued"),
        ("drilling_permit", "drilling_permit"),
        ("spud_reported", "spud_reported"),
        ("spud", "spud_reported"),
        ("drill_result", "drill_result"),
        ("drilling_result", "drill_result"),
        ("completion_reported", "completion_reported"),
        ("well_completion", "well_completion"),
        ("well_record", "well_record"),
        ("production_reported", "production_reported"),
        ("production", "production_reported"),
        ("plugging_report", "plugging_report"),
        ("p_and_a", "plugging_report"),
    ])
});

const NUMERIC_FIELDS: &[&str] = &[
    "depth_proposed",
    "td_reached",
    "ip_boed",
    "lateral_length_ft",
    "proppant_lbs",
    "frac_stages",
    "oil_bbl",
    "gas_mcf",
    "water_bbl",
];

fn normalize_type(raw: Option<&str>) -> String {
    let key = match raw {
        Some(s) if !s.trim().is_empty() => s.trim().to_lowercase().replace([' ', '-'], "_"),
        _ => return "unknown".to_string(),
    };
    TYPE_ALIASES.get(key.as_str()).map(|s| s.to_string()).unwrap_or(key)
}

fn normalize_api(raw: Option<&str>) -> Option<String> {
    clean_str(raw?).map(|s| s.trim_matches('-').to_string()).filter(|s| !s.is_empty())
}

fn lineage_id(payload: &Value) -> Option<String> {
    if let Some(api) = payload.get("api").and_then(Value::as_str) {
        if !api.is_empty() {
            return Some(format!("TX:{api}"));
        }
    }
    let permit_no = payload.get("permit_no").and_then(Value::as_str).and_then(clean_str);
    permit_no.map(|p| format!("TX:permit:{p}"))
}

pub struct TexasRrcAdapter;

impl SourceAdapter for TexasRrcAdapter {
    fn source_system(&self) -> &'static str {
        SOURCE_SYSTEM
    }

    fn canonicalize(&self, payload: Value) -> Value {
        let mut p = match payload {
            Value::Object(map) => map,
            _ => Default::default(),
        };

        p.insert("region".into(), json!("Texas"));
        p.insert("type".into(), json!(normalize_type(p.get("type").and_then(Value::as_str))));
        p.insert(
            "operator".into(),
            json!(p.get("operator").and_then(Value::as_str).and_then(clean_str)),
        );

        if let Some(api) = normalize_api(p.get("api").and_then(Value::as_str)) {
            p.insert("api".into(), json!(api));
        }

        for key in ["field", "county", "district", "well_name", "well_type"] {
            if let Some(value) = p.get(key).and_then(Value::as_str) {
                p.insert(key.into(), json!(clean_str(value)));
            }
        }

        if let Some(permit_no) = p.get("permit_no").and_then(Value::as_str).and_then(clean_str) {
            p.insert("permit_no".into(), json!(permit_no.clone()));
            p.entry("permit_id").or_insert(json!(permit_no));
        }

        for key in NUMERIC_FIELDS {
            if p.contains_key(*key) {
                let value = coerce_number(p.get(*key));
                p.insert((*key).into(), json!(value));
            }
        }
        for key in ["latitude", "longitude"] {
            if p.contains_key(key) {
                let value = coerce_number(p.get(key));
                p.insert(key.into(), json!(value));
            }
        }

        let payload = Value::Object(p);
        let lineage = lineage_id(&payload);
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
    }

    fn source_event_id(&self, envelope: &Value, payload: &Value) -> String {
        if let Some(explicit) = envelope.get("source_event_id").and_then(Value::as_str).and_then(clean_str) {
            return explicit;
        }
        let api = payload.get("api").and_then(Value::as_str);
        let event_type = payload.get("type").and_then(Value::as_str);
        match (api, event_type) {
            (Some(api), Some(event_type)) if !api.is_empty() => format!("{api}|{event_type}"),
            _ => "UNKNOWN".to_string(),
        }
    }

    fn canonical_doc_id(&self, source_event_id: &str, payload: &Value) -> String {
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or("");
        let api = payload.get("api").and_then(Value::as_str).unwrap_or("");
        let seed = format!("{source_event_id}|{event_type}|{api}");
        canonical_doc_id_from_seed(SOURCE_SYSTEM, &seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_spud_to_spud_reported() {
        let adapter = TexasRrcAdapter;
        let payload = adapter.canonicalize(json!({"type": "spud", "api": "42-301-00001"}));
        assert_eq!(payload["type"], "spud_reported");
    }

    #[test]
    fn lineage_prefers_api_over_permit_no() {
        let adapter = TexasRrcAdapter;
        let payload = adapter.canonicalize(json!({"api": "42-301-00001", "permit_no": "P-1"}));
        assert_eq!(payload["lineage_id"], "TX:42-301-00001");
    }

    #[test]
    fn lineage_falls_back_to_permit_no() {
        let adapter = TexasRrcAdapter;
        let payload = adapter.canonicalize(json!({"permit_no": "P-1"}));
        assert_eq!(payload["lineage_id"], "TX:permit:P-1");
    }

    #[test]
    fn source_event_id_is_literal_not_hashed() {
        let adapter = TexasRrcAdapter;
        let payload = adapter.canonicalize(json!({"type": "spud", "api": "42-301-00001"}));
        assert_eq!(adapter.source_event_id(&json!({}), &payload), "42-301-00001|spud_reported");
    }

    #[test]
    fn api_dashes_are_trimmed_not_removed() {
        assert_eq!(normalize_api(Some("-42-301-00001-")), Some("42-301-00001".to_string()));
    }

    #[test]
    fn numeric_fields_coerce_or_null() {
        let adapter = TexasRrcAdapter;
        let payload = adapter.canonicalize(json!({"ip_boed": "450.5", "oil_bbl": "not a number"}));
        assert_eq!(payload["ip_boed"], 450.5);
        assert!(payload["oil_bbl"].is_null());
    }
}
