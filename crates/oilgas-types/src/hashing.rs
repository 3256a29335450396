//! Content hashing and stable identifier derivation.
//!
//! `content_hash` is a pure function of the payload: the same JSON value,
//! however its object keys were constructed, always hashes identically.
//! Array order is significant and never reordered.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Serializes `value` as compact JSON with every object's keys sorted
/// lexicographically at every nesting level. Arrays keep their order.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (k, v)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(k).expect("string keys always serialize"));
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => {
            out.push_str(&serde_json::to_string(other).expect("scalars always serialize"));
        }
    }
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// `content_hash(payload)` — SHA-256 hex of the canonical JSON encoding.
pub fn content_hash(payload: &Value) -> String {
    sha256_hex(&canonical_json(payload))
}

/// `canonical_doc_id(source_system, content_hash_hex)`.
///
/// Adapters that need a source-specific identity seed (mixing event type,
/// upstream id, and identity fields) should hash that seed themselves and
/// pass the resulting hex through here as `content_hash_hex` — the final
/// shape is always `"{source_system}:{hex16}"`.
pub fn canonical_doc_id(source_system: &str, content_hash_hex: &str) -> String {
    format!("{source_system}:{}", &content_hash_hex[..16.min(content_hash_hex.len())])
}

/// `canonical_doc_id` derived from an arbitrary seed string rather than a
/// content hash — the common path for adapters (lineage/identity seeds).
pub fn canonical_doc_id_from_seed(source_system: &str, seed: &str) -> String {
    canonical_doc_id(source_system, &sha256_hex(seed))
}

/// First `n` hex chars of SHA-256 of `seed`. Used throughout the adapters
/// for `lineage_id` and `source_event_id` derivation.
pub fn sha_hex_prefix(seed: &str, n: usize) -> String {
    let digest = sha256_hex(seed);
    digest[..n.min(digest.len())].to_string()
}

/// `alert_id(canonical_doc_id, tier, event_type)` — first 24 hex chars of
/// SHA-256 of `"{canonical_doc_id}|{tier}|{event_type}"`.
pub fn alert_id(canonical_doc_id: &str, tier: &str, event_type: &str) -> String {
    let seed = format!("{canonical_doc_id}|{tier}|{event_type}");
    sha_hex_prefix(&seed, 24)
}

/// Alert id for a chain-progression alert. The literal `"AK"` in the seed
/// is preserved verbatim for every lineage, Alaska or not — changing it
/// would silently rotate every existing alert's identity.
pub fn chain_progression_alert_id(lineage_id: &str, utc_date: &str) -> String {
    let seed = format!("chain_progression|AK|{lineage_id}|{utc_date}");
    sha_hex_prefix(&seed, 24)
}

/// `canonical_doc_id` for a chain-progression alert — first 24 hex chars
/// of SHA-256 of `"chain_progression|{lineage_id}|{last_event_time}"`.
pub fn chain_progression_canonical_doc_id(lineage_id: &str, last_event_time: &str) -> String {
    let seed = format!("chain_progression|{lineage_id}|{last_event_time}");
    sha_hex_prefix(&seed, 24)
}

// Minimal hex encoding kept local to this module rather than pulling in a
// dedicated hex crate for a handful of call sites.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        let bytes = bytes.as_ref();
        let mut out = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            out.push_str(&format!("{:02x}", b));
        }
        out
    }
}
