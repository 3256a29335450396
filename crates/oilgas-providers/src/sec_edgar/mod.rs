//! SEC insider (Form 4) and institutional-ownership filings.
//!
//! Unlike the other policy-style adapters, lineage here keys off the
//! filer/company identity alone — SEC filings don't carry a docket or
//! bill to fall back on.

mod form4;
mod live;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use oilgas_types::{canonical_doc_id_from_seed, coerce_datetime_value, coerce_number, sha_hex_prefix};
use oilgas_universe::{resolve_company, Universe};

use crate::common::{clean_str, clean_value};
use crate::traits::SourceAdapter;

pub use form4::{classify_form4_transaction, extract_form4_xml, parse_form4_transactions, Form4Transaction, ReportingOwner};
pub use live::{fetch_live_events, Form4Stats, LiveEvent};

pub const SOURCE_SYSTEM: &str = "sec_edgar";

static TYPE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("insider_buy", "insider_buy"),
        ("insider_purchase", "insider_buy"),
        ("form4_purchase", "insider_buy"),
        ("insider_sell", "insider_sell"),
        ("insider_sale", "insider_sell"),
        ("form4_sale", "insider_sell"),
        ("insider_option_exercise", "insider_option_exercise"),
        ("option_exercise", "insider_option_exercise"),
        ("form4_exercise", "insider_option_exercise"),
        ("institutional_13g", "institutional_13g"),
        ("13g", "institutional_13g"),
        ("sc_13g", "institutional_13g"),
        ("institutional_13f", "institutional_13f"),
        ("13f", "institutional_13f"),
        ("13f-hr", "institutional_13f"),
    ])
});

static TX_TYPE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("purchase", "purchase"),
        ("buy", "purchase"),
        ("p", "purchase"),
        ("sale", "sale"),
        ("sell", "sale"),
        ("s", "sale"),
        ("exercise", "exercise"),
        ("option_exercise", "exercise"),
        ("m", "exercise"),
    ])
});

fn normalize_type(raw: Option<&str>) -> String {
    let key = match raw {
        Some(s) if !s.trim().is_empty() => s.trim().to_lowercase().replace([' ', '-'], "_"),
        _ => return "unknown".to_string(),
    };
    TYPE_ALIASES.get(key.as_str()).map(|s| s.to_string()).unwrap_or(key)
}

fn default_transaction_type_for(event_type: &str) -> Option<&'static str> {
    match event_type {
        "insider_buy" => Some("purchase"),
        "insider_sell" => Some("sale"),
        "insider_option_exercise" => Some("exercise"),
        "institutional_13g" | "institutional_13f" => Some("purchase"),
        _ => None,
    }
}

fn normalize_transaction_type(raw: Option<&str>, event_type: &str) -> Option<String> {
    match raw.and_then(clean_str) {
        Some(s) => {
            let key = s.to_lowercase();
            Some(TX_TYPE_ALIASES.get(key.as_str()).map(|s| s.to_string()).unwrap_or(key))
        }
        None => default_transaction_type_for(event_type).map(str::to_string),
    }
}

/// SEC ticker symbols sometimes carry a class suffix (`BRK.B`) or stray
/// whitespace; normalize to the bare uppercase symbol `ticker_to_cik`
/// lookups expect.
pub(crate) fn normalize_ticker_symbol(raw: &str) -> Option<String> {
    let cleaned = clean_str(raw)?.to_uppercase();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned)
}

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Normalizes a filer/company name for lineage hashing: lowercase,
/// non-alphanumeric runs collapsed to a single space, trimmed. Distinct
/// from `common::clean_str`, which only trims and empties-to-None.
fn norm_name(raw: &str) -> String {
    let lower = raw.to_lowercase();
    NON_ALNUM.replace_all(&lower, " ").trim().to_string()
}

fn derive_lineage_id(payload: &Value) -> Option<String> {
    if let Some(company_id) = payload.get("company_id").and_then(Value::as_str).and_then(clean_str) {
        return Some(format!("SEC:{company_id}"));
    }
    let name = payload
        .get("company")
        .and_then(Value::as_str)
        .and_then(clean_str)
        .or_else(|| payload.get("filer_name").and_then(Value::as_str).and_then(clean_str))?;
    Some(format!("SEC:{}", sha_hex_prefix(&norm_name(&name), 16)))
}

const NUMERIC_FIELDS: &[&str] = &["shares", "price_per_share", "total_value", "co_reporting_owner_count"];

pub struct SecEdgarAdapter<'u> {
    universe: &'u Universe,
}

impl<'u> SecEdgarAdapter<'u> {
    pub fn new(universe: &'u Universe) -> Self {
        Self { universe }
    }
}

impl<'u> SourceAdapter for SecEdgarAdapter<'u> {
    fn source_system(&self) -> &'static str {
        SOURCE_SYSTEM
    }

    fn canonicalize(&self, payload: Value) -> Value {
        let mut p = match payload {
            Value::Object(map) => map,
            _ => Default::default(),
        };

        let event_type = normalize_type(p.get("type").and_then(Value::as_str));
        p.insert("type".into(), json!(event_type));
        p.insert("form_type".into(), json!(clean_value(p.get("form_type"))));
        p.insert("filing_accession".into(), json!(clean_value(p.get("filing_accession"))));
        p.insert("filer_name".into(), json!(clean_value(p.get("filer_name"))));
        p.insert("relationship".into(), json!(clean_value(p.get("relationship"))));
        p.insert(
            "transaction_type".into(),
            json!(normalize_transaction_type(p.get("transaction_type").and_then(Value::as_str), &event_type)),
        );
        p.insert("security_title".into(), json!(clean_value(p.get("security_title"))));
        p.insert("underlying_security_title".into(), json!(clean_value(p.get("underlying_security_title"))));
        p.insert("direct_or_indirect".into(), json!(clean_value(p.get("direct_or_indirect"))));
        p.insert("officer_title".into(), json!(clean_value(p.get("officer_title"))));
        p.insert("company".into(), json!(clean_value(p.get("company"))));
        p.insert(
            "tickers".into(),
            json!(crate::common::normalize_tickers(p.get("tickers"))),
        );
        p.insert("filing_url".into(), json!(clean_value(p.get("filing_url"))));

        for key in NUMERIC_FIELDS {
            if p.contains_key(*key) {
                p.insert((*key).into(), json!(coerce_number(p.get(*key))));
            }
        }

        let shares = p.get("shares").and_then(Value::as_f64);
        let price = p.get("price_per_share").and_then(Value::as_f64);
        let total_value = p.get("total_value").and_then(Value::as_f64);
        if total_value.is_none() {
            if let (Some(shares), Some(price)) = (shares, price) {
                p.insert("total_value".into(), json!((shares * price * 100.0).round() / 100.0));
            }
        }

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
            .or_else(|| coerce_datetime_value(payload.get("transaction_date")))
            .or_else(|| coerce_datetime_value(payload.get("filing_date")))
    }

    fn source_event_id(&self, envelope: &Value, payload: &Value) -> String {
        if let Some(explicit) = envelope.get("source_event_id").and_then(Value::as_str).and_then(clean_str) {
            return explicit;
        }
        let accession = payload.get("filing_accession").and_then(Value::as_str).unwrap_or("");
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or("");
        let filer = payload.get("filer_name").and_then(Value::as_str).unwrap_or("");
        let company = payload.get("company").and_then(Value::as_str).unwrap_or("");
        let transaction_type = payload.get("transaction_type").and_then(Value::as_str).unwrap_or("");
        let shares = payload.get("shares").and_then(Value::as_f64).map(|v| v.to_string()).unwrap_or_default();
        let event_time = payload.get("event_time").and_then(Value::as_str).unwrap_or("");
        let seed = format!("{accession}|{event_type}|{filer}|{company}|{transaction_type}|{shares}|{event_time}");
        format!("sec_{}", sha_hex_prefix(&seed, 24))
    }

    fn canonical_doc_id(&self, source_event_id: &str, payload: &Value) -> String {
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or("");
        let accession = payload.get("filing_accession").and_then(Value::as_str).unwrap_or("");
        let company = payload.get("company").and_then(Value::as_str).unwrap_or("");
        let seed = format!("{source_event_id}|{event_type}|{accession}|{company}");
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
    fn aliases_form4_sale_to_insider_sell() {
        let universe = Universe::empty();
        let adapter = SecEdgarAdapter::new(&universe);
        let payload = adapter.canonicalize(json!({"type": "form4_sale"}));
        assert_eq!(payload["type"], "insider_sell");
    }

    #[test]
    fn missing_transaction_type_defaults_from_event_type() {
        let universe = Universe::empty();
        let adapter = SecEdgarAdapter::new(&universe);
        let payload = adapter.canonicalize(json!({"type": "insider_buy"}));
        assert_eq!(payload["transaction_type"], "purchase");
    }

    #[test]
    fn total_value_is_computed_from_shares_and_price() {
        let universe = Universe::empty();
        let adapter = SecEdgarAdapter::new(&universe);
        let payload = adapter.canonicalize(json!({"type": "insider_buy", "shares": 100, "price_per_share": 12.5}));
        assert_eq!(payload["total_value"], json!(1250.0));
    }

    #[test]
    fn lineage_falls_back_to_filer_name_when_no_company() {
        let universe = Universe::empty();
        let adapter = SecEdgarAdapter::new(&universe);
        let payload = adapter.canonicalize(json!({"filer_name": "Jane Q. Insider"}));
        let expected = format!("SEC:{}", sha_hex_prefix(&norm_name("Jane Q. Insider"), 16));
        assert_eq!(payload["lineage_id"], expected);
    }

    #[test]
    fn resolves_company_and_backfills_tickers() {
        let universe = universe_with_acme();
        let adapter = SecEdgarAdapter::new(&universe);
        let payload = adapter.canonicalize(json!({"company": "Acme Oil"}));
        assert_eq!(payload["company_id"], "ACME");
        assert_eq!(payload["tickers"], json!(["ACM"]));
    }

    #[test]
    fn norm_name_collapses_punctuation_and_case() {
        assert_eq!(norm_name("Jane Q. Insider"), "jane q insider");
    }

    #[test]
    fn source_event_id_is_stable_for_same_inputs() {
        let universe = Universe::empty();
        let adapter = SecEdgarAdapter::new(&universe);
        let envelope = json!({});
        let payload = adapter.canonicalize(json!({"type": "insider_buy", "filing_accession": "0000320193-26-000001"}));
        let a = adapter.source_event_id(&envelope, &payload);
        let b = adapter.source_event_id(&envelope, &payload);
        assert_eq!(a, b);
        assert!(a.starts_with("sec_"));
    }
}
