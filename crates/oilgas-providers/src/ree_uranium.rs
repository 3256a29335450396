//! Critical-minerals (rare-earth and uranium) project events.
//!
//! Lineage is project-based rather than permit- or filer-based:
//! `company + project` for ordinary events,
//! `policy + commodity` for `policy_designation` events that have no
//! project of their own.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use oilgas_types::{canonical_doc_id_from_seed, coerce_datetime_value, coerce_number, sha_hex_prefix};

use crate::common::{clean_str, normalize_tickers};
use crate::traits::SourceAdapter;

pub const SOURCE_SYSTEM: &str = "ree_uranium";

const NUMERIC_FIELDS: &[&str] = &[
    "treo_pct",
    "mreo_pct",
    "u3o8_ppm",
    "gt_metric",
    "interval_m",
    "interval_ft",
    "from_m",
    "to_m",
    "from_ft",
    "to_ft",
    "tonnage_mt",
    "grade_treo_pct",
    "grade_u3o8_pct",
    "contained_treo_kt",
    "contained_u3o8_mlbs",
    "npv_8_musd",
    "irr_pct",
    "capex_musd",
    "opex_per_kg_reo",
    "payback_years",
    "amount_cad",
    "price_per_share_cad",
    "shares_issued",
    "quantity_mlbs",
    "claims_count",
    "area_ha",
    "area_acres",
];

static COMMODITY_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ree", "REE"),
        ("rare earths", "REE"),
        ("rare earth", "REE"),
        ("rare earth elements", "REE"),
        ("uranium", "uranium"),
        ("u3o8", "uranium"),
        ("u", "uranium"),
    ])
});

fn normalize_commodity(raw: Option<&str>) -> Option<String> {
    let raw = clean_str(raw?)?;
    let key = raw.to_lowercase();
    Some(COMMODITY_ALIASES.get(key.as_str()).map(|s| s.to_string()).unwrap_or(key))
}

fn normalize_type(raw: Option<&str>) -> String {
    match raw {
        Some(s) if !s.trim().is_empty() => s.trim().to_lowercase().replace([' ', '-'], "_"),
        _ => "unknown".to_string(),
    }
}

fn lineage_id(payload: &Value) -> Option<String> {
    let company = payload.get("company").and_then(Value::as_str);
    let project = payload.get("project").and_then(Value::as_str);
    if let (Some(company), Some(project)) = (company, project) {
        if !company.is_empty() && !project.is_empty() {
            return Some(sha_hex_prefix(&format!("REE_U|{company}|{project}"), 20));
        }
    }
    if payload.get("type").and_then(Value::as_str) == Some("policy_designation") {
        let policy = payload.get("policy").and_then(Value::as_str).unwrap_or("unknown");
        let commodity = payload.get("commodity").and_then(Value::as_str).unwrap_or("unknown");
        return Some(sha_hex_prefix(&format!("REE_U|policy|{policy}|{commodity}"), 20));
    }
    None
}

pub struct ReeUraniumAdapter;

impl SourceAdapter for ReeUraniumAdapter {
    fn source_system(&self) -> &'static str {
        SOURCE_SYSTEM
    }

    fn canonicalize(&self, payload: Value) -> Value {
        let mut p = match payload {
            Value::Object(map) => map,
            _ => Default::default(),
        };

        p.insert("type".into(), json!(normalize_type(p.get("type").and_then(Value::as_str))));
        p.insert("commodity".into(), json!(normalize_commodity(p.get("commodity").and_then(Value::as_str))));
        p.insert("company".into(), json!(p.get("company").and_then(Value::as_str).and_then(clean_str)));
        p.insert("project".into(), json!(p.get("project").and_then(Value::as_str).and_then(clean_str)));
        p.insert("region".into(), json!(p.get("region").and_then(Value::as_str).and_then(clean_str)));
        p.insert(
            "jurisdiction".into(),
            json!(p.get("jurisdiction").and_then(Value::as_str).and_then(clean_str)),
        );
        p.insert("tickers".into(), json!(normalize_tickers(p.get("tickers"))));

        for key in NUMERIC_FIELDS {
            if p.contains_key(*key) {
                p.insert((*key).into(), json!(coerce_number(p.get(*key))));
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
        let company = payload.get("company").and_then(Value::as_str).unwrap_or("");
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or("");
        let project = payload.get("project").and_then(Value::as_str).unwrap_or("");
        if company.is_empty() && event_type.is_empty() && project.is_empty() {
            return sha_hex_prefix("", 16);
        }
        sha_hex_prefix(&format!("{company}|{event_type}|{project}"), 16)
    }

    fn canonical_doc_id(&self, source_event_id: &str, payload: &Value) -> String {
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or("");
        let company = payload.get("company").and_then(Value::as_str).unwrap_or("");
        let project = payload.get("project").and_then(Value::as_str).unwrap_or("");
        let seed = format!("{source_event_id}|{event_type}|{company}|{project}");
        canonical_doc_id_from_seed(SOURCE_SYSTEM, &seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commodity_aliases_normalize_to_ree() {
        assert_eq!(normalize_commodity(Some("Rare Earth Elements")), Some("REE".to_string()));
        assert_eq!(normalize_commodity(Some("U3O8")), Some("uranium".to_string()));
    }

    #[test]
    fn lineage_is_project_based() {
        let adapter = ReeUraniumAdapter;
        let payload = adapter.canonicalize(json!({"company": "Rare Earth Co", "project": "Mountain Pass II"}));
        assert!(payload["lineage_id"].as_str().unwrap().len() == 20);
    }

    #[test]
    fn policy_event_without_project_uses_policy_commodity() {
        let adapter = ReeUraniumAdapter;
        let payload = adapter.canonicalize(
            json!({"type": "policy_designation", "policy": "critical minerals list", "commodity": "REE"}),
        );
        assert!(!payload["lineage_id"].as_str().unwrap().is_empty());
    }

    #[test]
    fn tickers_accept_comma_string() {
        let adapter = ReeUraniumAdapter;
        let payload = adapter.canonicalize(json!({"tickers": "ABC, DEF"}));
        assert_eq!(payload["tickers"], json!(["ABC", "DEF"]));
    }
}
