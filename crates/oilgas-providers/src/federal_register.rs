//! Federal Register final-rule publications.
//!
//! `lineage_id` tries `company_id`, then a normalized `company` hash,
//! then `docket_id` — a
//! policy event with no named company still gets a stable per-docket
//! lineage so repeated rulemaking notices on the same docket chain
//! together.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use oilgas_types::{canonical_doc_id_from_seed, coerce_datetime_value, sha_hex_prefix};
use oilgas_universe::{resolve_company, Universe};

use crate::common::{clean_str, clean_value, normalize_tickers};
use crate::traits::SourceAdapter;

pub const SOURCE_SYSTEM: &str = "federal_register_rules";

static TYPE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("policy_final_rule", "policy_final_rule"),
        ("final_rule", "policy_final_rule"),
        ("rule_published", "policy_final_rule"),
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
    if let Some(docket) = payload.get("docket_id").and_then(Value::as_str).and_then(clean_str) {
        return Some(format!("POLICY:{}", sha_hex_prefix(&docket.to_lowercase(), 16)));
    }
    None
}

pub struct FederalRegisterAdapter<'u> {
    universe: &'u Universe,
}

impl<'u> FederalRegisterAdapter<'u> {
    pub fn new(universe: &'u Universe) -> Self {
        Self { universe }
    }
}

impl<'u> SourceAdapter for FederalRegisterAdapter<'u> {
    fn source_system(&self) -> &'static str {
        SOURCE_SYSTEM
    }

    fn canonicalize(&self, payload: Value) -> Value {
        let mut p = match payload {
            Value::Object(map) => map,
            _ => Default::default(),
        };

        p.insert("type".into(), json!(normalize_type(p.get("type").and_then(Value::as_str))));
        p.insert("agency".into(), json!(clean_value(p.get("agency"))));
        p.insert("title".into(), json!(clean_value(p.get("title"))));
        p.insert("document_number".into(), json!(clean_value(p.get("document_number"))));
        p.insert("docket_id".into(), json!(clean_value(p.get("docket_id"))));
        p.insert(
            "rule_stage".into(),
            json!(clean_value(p.get("rule_stage")).unwrap_or_else(|| "final_rule".to_string())),
        );
        p.insert("publication_date".into(), json!(clean_value(p.get("publication_date"))));
        p.insert("effective_date".into(), json!(clean_value(p.get("effective_date"))));
        p.insert("impact_direction".into(), json!(normalize_impact(p.get("impact_direction").and_then(Value::as_str))));
        p.insert("impact_summary".into(), json!(clean_value(p.get("impact_summary"))));
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
            .or_else(|| coerce_datetime_value(payload.get("publication_date")))
            .or_else(|| coerce_datetime_value(payload.get("effective_date")))
    }

    fn source_event_id(&self, envelope: &Value, payload: &Value) -> String {
        if let Some(explicit) = envelope.get("source_event_id").and_then(Value::as_str).and_then(clean_str) {
            return explicit;
        }
        let doc_number = payload.get("document_number").and_then(Value::as_str).unwrap_or("");
        let docket_id = payload.get("docket_id").and_then(Value::as_str).unwrap_or("");
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or("policy_final_rule");
        let company = payload.get("company").and_then(Value::as_str).unwrap_or("");
        let seed = format!("{doc_number}|{docket_id}|{event_type}|{company}");
        format!("fr_{}", sha_hex_prefix(&seed, 24))
    }

    fn canonical_doc_id(&self, source_event_id: &str, payload: &Value) -> String {
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or("");
        let doc_number = payload.get("document_number").and_then(Value::as_str).unwrap_or("");
        let company = payload.get("company").and_then(Value::as_str).unwrap_or("");
        let seed = format!("{source_event_id}|{event_type}|{doc_number}|{company}");
        canonical_doc_id_from_seed(SOURCE_SYSTEM, &seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oilgas_universe::Company;

    fn universe_with_acme() -> Universe {
        Universe {
            companies: vec![Company {
                company_id: "ACME".into(),
                name: "Acme Oil".into(),
                aliases: vec![],
                tickers: vec!["ACM".into()],
            }],
            assets: vec![],
            watchlists: Default::default(),
        }
    }

    #[test]
    fn aliases_final_rule_to_policy_final_rule() {
        let universe = Universe::empty();
        let adapter = FederalRegisterAdapter::new(&universe);
        let payload = adapter.canonicalize(json!({"type": "final_rule"}));
        assert_eq!(payload["type"], "policy_final_rule");
    }

    #[test]
    fn resolves_company_and_backfills_tickers() {
        let universe = universe_with_acme();
        let adapter = FederalRegisterAdapter::new(&universe);
        let payload = adapter.canonicalize(json!({"company": "Acme Oil"}));
        assert_eq!(payload["company_id"], "ACME");
        assert_eq!(payload["tickers"], json!(["ACM"]));
    }

    #[test]
    fn lineage_falls_back_through_company_then_docket() {
        let universe = Universe::empty();
        let adapter = FederalRegisterAdapter::new(&universe);
        let with_docket = adapter.canonicalize(json!({"docket_id": "EPA-2026-0001"}));
        assert!(with_docket["lineage_id"].as_str().unwrap().starts_with("POLICY:"));
    }
}
