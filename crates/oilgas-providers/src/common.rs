//! Helpers shared by every source adapter.

use std::fs;
use std::path::Path;

use serde_json::Value;

use oilgas_index::Database;
use oilgas_types::RawEvent;

use crate::traits::SourceAdapter;
use crate::Result;

/// Trims and collapses internal whitespace; an all-blank string becomes
/// `None` rather than `Some("")`. Case is preserved — this is distinct
/// from `oilgas_types::normalize_text`, which is for resolver comparisons.
pub fn clean_str(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Same as [`clean_str`] but accepting any JSON scalar, stringifying
/// numbers/bools first. Mirrors the adapters' habit of accepting loosely
/// typed fixture input.
pub fn clean_value(raw: Option<&Value>) -> Option<String> {
    match raw {
        Some(Value::String(s)) => clean_str(s),
        Some(Value::Number(n)) => clean_str(&n.to_string()),
        Some(Value::Bool(b)) => clean_str(&b.to_string()),
        _ => None,
    }
}

/// Normalizes a tickers field that may arrive as a JSON array or as a
/// single comma-separated string.
pub fn normalize_tickers(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Iterates the non-blank, well-formed JSON lines of a JSONL fixture,
/// silently skipping blank lines and lines that fail to parse — malformed
/// source records are dropped, never fatal to the batch.
pub fn iter_jsonl_objects(path: impl AsRef<Path>) -> Vec<Value> {
    let path = path.as_ref();
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            serde_json::from_str::<Value>(line).ok()
        })
        .filter(|v| v.is_object())
        .collect()
}

/// Drives a fixture file through an adapter's canonicalization and into
/// the storage repository: parse JSONL → canonicalize payload → derive
/// `event_time`/`source_event_id`/`canonical_doc_id` → insert-or-ignore.
///
/// Returns `(inserted, processed)`, matching the original adapters'
/// convention of reporting both the new-row count and the total seen.
pub fn ingest_fixture_generic(
    adapter: &dyn SourceAdapter,
    path: impl AsRef<Path>,
    db: &Database,
) -> Result<(usize, usize)> {
    let mut inserted = 0usize;
    let mut processed = 0usize;

    for envelope in iter_jsonl_objects(path) {
        processed += 1;

        let raw_payload = envelope
            .get("payload_json")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        let payload = adapter.canonicalize(raw_payload);

        let event_time = envelope
            .get("event_time")
            .and_then(Value::as_str)
            .and_then(oilgas_types::coerce_datetime)
            .or_else(|| adapter.event_time(&payload));

        let source_event_id = adapter.source_event_id(&envelope, &payload);
        let canonical_doc_id = adapter.canonical_doc_id(&source_event_id, &payload);

        let mut event = RawEvent::new(
            adapter.source_system(),
            Some(source_event_id),
            event_time,
            payload,
        );
        event.canonical_doc_id = Some(canonical_doc_id);

        let (did_insert, _id) = db.insert_raw_event(&event)?;
        if did_insert {
            inserted += 1;
        }
    }

    Ok((inserted, processed))
}
