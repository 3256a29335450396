//! The common shape every per-source adapter implements.
//!
//! Each source owns its own canonicalization rules, lineage formula, and
//! id derivation, but every adapter reduces to the same four operations —
//! this trait is what lets `common::ingest_fixture_generic` drive them
//! all through one loop.

use chrono::{DateTime, Utc};
use serde_json::Value;

pub trait SourceAdapter {
    /// The `source_system` tag stamped on every `RawEvent` this adapter
    /// produces.
    fn source_system(&self) -> &'static str;

    /// Normalizes a raw fixture payload into the canonical shape for this
    /// source: type aliasing, field cleaning, numeric coercion, lineage_id
    /// derivation, and (where applicable) company resolution.
    fn canonicalize(&self, payload: Value) -> Value;

    /// Derives `event_time` from the canonicalized payload when the
    /// envelope itself carried none explicitly.
    fn event_time(&self, payload: &Value) -> Option<DateTime<Utc>>;

    /// Derives `source_event_id`: the envelope's explicit id when present,
    /// else a source-specific fallback. Adapters may use a literal
    /// concatenation instead of a hash when the upstream system already
    /// guarantees uniqueness.
    fn source_event_id(&self, envelope: &Value, payload: &Value) -> String;

    /// Derives the source-specific `canonical_doc_id` seed and hashes it
    /// through `oilgas_types::canonical_doc_id_from_seed`.
    fn canonical_doc_id(&self, source_event_id: &str, payload: &Value) -> String;
}
