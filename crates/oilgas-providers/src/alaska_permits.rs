//! Alaska Oil & Gas Conservation Commission permit filings.
//!
//! Lineage groups every event sharing a `(permit_id, operator, region)`
//! triple — the same formula
//! `alaska_wells` uses, which is what ties permits and well records into
//! one chain.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use oilgas_types::{canonical_doc_id_from_seed, coerce_datetime_value, format_iso_z, sha_hex_prefix};

use crate::common::clean_str;
use crate::traits::SourceAdapter;

pub const SOURCE_SYSTEM: &str = "alaska_permits";

fn lineage_id(permit_id: &str, operator: &str, region: &str) -> String {
    sha_hex_prefix(&format!("AK|{permit_id}|{operator}|{region}"), 20)
}

pub struct AlaskaPermitsAdapter;

impl SourceAdapter for AlaskaPermitsAdapter {
    fn source_system(&self) -> &'static str {
        SOURCE_SYSTEM
    }

    fn canonicalize(&self, payload: Value) -> Value {
        let permit_id = clean_str(
            payload
                .get("permit_id")
                .or_else(|| payload.get("permit"))
                .or_else(|| payload.get("permit_number"))
                .and_then(Value::as_str)
                .unwrap_or(""),
        )
        .unwrap_or_else(|| "UNKNOWN".to_string());

        let operator = clean_str(
            payload
                .get("operator")
                .or_else(|| payload.get("lessee"))
                .and_then(Value::as_str)
                .unwrap_or(""),
        )
        .unwrap_or_else(|| "UNKNOWN".to_string());

        let region = clean_str(
            payload
                .get("region")
                .or_else(|| payload.get("state"))
                .and_then(Value::as_str)
                .unwrap_or(""),
        )
        .unwrap_or_else(|| "Alaska".to_string());

        let activity = payload
            .get("activity")
            .or_else(|| payload.get("description"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "exploration".to_string());

        let lineage = lineage_id(&permit_id, &operator, &region);

        let event_time = payload
            .get("event_time")
            .or_else(|| payload.get("date"))
            .or_else(|| payload.get("filed_at"))
            .or_else(|| payload.get("reported_at"))
            .and_then(Value::as_str)
            .and_then(oilgas_types::coerce_datetime)
            .map(format_iso_z);

        json!({
            "type": "permit_filed",
            "jurisdiction": "AK",
            "source": SOURCE_SYSTEM,
            "permit_id": permit_id,
            "operator": operator,
            "region": region,
            "activity": activity,
            "event_time": event_time,
            "lineage_id": lineage,
        })
    }

    fn event_time(&self, payload: &Value) -> Option<DateTime<Utc>> {
        coerce_datetime_value(payload.get("event_time"))
    }

    fn source_event_id(&self, envelope: &Value, payload: &Value) -> String {
        if let Some(explicit) = envelope.get("source_event_id").and_then(Value::as_str) {
            if let Some(cleaned) = clean_str(explicit) {
                return cleaned;
            }
        }
        payload
            .get("permit_id")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string()
    }

    fn canonical_doc_id(&self, source_event_id: &str, payload: &Value) -> String {
        let lineage = payload.get("lineage_id").and_then(Value::as_str).unwrap_or("");
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or("");
        let seed = format!("{SOURCE_SYSTEM}|{event_type}|{lineage}|{source_event_id}");
        canonical_doc_id_from_seed(SOURCE_SYSTEM, &seed)
    }
}
