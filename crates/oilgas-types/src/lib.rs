//! Canonical schema, content hashing, and id derivation shared by every
//! crate in the workspace.

pub mod coerce;
pub mod error;
pub mod event;
pub mod hashing;

pub use coerce::{coerce_datetime, coerce_datetime_value, coerce_number, format_iso_z, normalize_text};
pub use error::{Error, Result};
pub use event::{Alert, RawEvent, Tier, ALERT_EVENT_TYPE_CHAIN_PROGRESSION};
pub use hashing::{
    alert_id, canonical_doc_id, canonical_doc_id_from_seed, canonical_json,
    chain_progression_alert_id, chain_progression_canonical_doc_id, content_hash, sha_hex_prefix,
};
