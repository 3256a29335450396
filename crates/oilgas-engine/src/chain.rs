//! The chain aggregator: groups canonical events by lineage,
//! applies source-specific progression semantics, and computes an
//! additive, unclamped score.
//!
//! Scoring uses a staged-weights-plus-bonuses scheme: each stage flag
//! reached contributes its own weight, with additional bonuses for
//! region/commodity-qualified combinations and insider-buy clusters.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use oilgas_types::RawEvent;

const INSIDER_CLUSTER_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, Serialize)]
pub struct StageFlags {
    pub has_permit: bool,
    pub has_spud: bool,
    pub has_well: bool,
    pub has_production: bool,
    pub has_claims: bool,
    pub has_drill_assay: bool,
    pub has_resource: bool,
    pub has_study: bool,
    pub has_deal: bool,
    pub has_policy: bool,
    pub has_insider_buy: bool,
    pub has_insider_buy_cluster: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChainContext {
    pub operator: Option<String>,
    pub region: Option<String>,
    pub permit_id: Option<String>,
    pub field: Option<String>,
    pub county: Option<String>,
    pub company: Option<String>,
    pub project: Option<String>,
    pub commodity: Option<String>,
    pub tickers: Option<Value>,
    pub company_id: Option<String>,
    pub ip_boed: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainRow {
    pub lineage_id: String,
    pub flags: StageFlags,
    pub context: ChainContext,
    pub last_event_time: Option<DateTime<Utc>>,
    pub score: f64,
}

/// Computes chain rows for a list of events, sorted by score descending.
/// Events without a `lineage_id` are discarded.
pub fn compute_chain_scores(events: &[RawEvent]) -> Vec<ChainRow> {
    let mut groups: BTreeMap<String, Vec<&RawEvent>> = BTreeMap::new();
    for event in events {
        if let Some(lineage_id) = lineage_id_of(event) {
            groups.entry(lineage_id).or_default().push(event);
        }
    }

    let mut rows: Vec<ChainRow> = groups
        .into_iter()
        .map(|(lineage_id, events)| build_chain_row(lineage_id, &events))
        .collect();

    rows.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    rows
}

fn lineage_id_of(event: &RawEvent) -> Option<String> {
    event.payload_json.get("lineage_id")?.as_str().map(str::to_string)
}

fn build_chain_row(lineage_id: String, events: &[&RawEvent]) -> ChainRow {
    let mut flags = StageFlags::default();
    let mut context = ChainContext::default();
    let mut last_event_time: Option<DateTime<Utc>> = None;

    // insider_buy events for the 30-day cluster check, kept in arrival
    // order for a stable evaluation — cluster membership depends on
    // pairwise gaps, which is itself order-independent.
    let mut insider_buys: Vec<(DateTime<Utc>, String)> = Vec::new();

    for event in events {
        let payload = &event.payload_json;
        let is_texas = payload.get("region").and_then(Value::as_str).map(|r| r.eq_ignore_ascii_case("texas")).unwrap_or(false);
        let commodity = payload.get("commodity").and_then(Value::as_str).map(str::to_lowercase);
        let is_ree_u = matches!(commodity.as_deref(), Some("ree") | Some("uranium"));
        let event_type = payload.get("type").and_then(Value::as_str).unwrap_or("");

        match event_type {
            "permit_filed" => flags.has_permit = true,
            "permit_issued" | "drilling_permit" if is_texas => flags.has_permit = true,
            "claims_staked" | "exploration_permit" if is_ree_u => {
                flags.has_permit = true;
                flags.has_claims = true;
            }
            "spud_reported" if is_texas => flags.has_spud = true,
            "well_record" | "completion_reported" => flags.has_well = true,
            "well_completion" | "drill_result" if is_texas => flags.has_well = true,
            "drill_assay" if is_ree_u => {
                flags.has_well = true;
                flags.has_drill_assay = true;
            }
            "production_reported" if is_texas => flags.has_production = true,
            "resource_estimate" if is_ree_u => flags.has_resource = true,
            "feasibility_study" if is_ree_u => flags.has_study = true,
            "deal_announced" | "financing_closed" | "offtake_agreement" if is_ree_u => flags.has_deal = true,
            "policy_designation" if is_ree_u => flags.has_policy = true,
            "insider_buy" => {
                flags.has_insider_buy = true;
                if let (Some(time), Some(filer)) = (
                    event.event_time,
                    payload.get("filer_name").and_then(Value::as_str),
                ) {
                    insider_buys.push((time, filer.to_string()));
                }
            }
            _ => {}
        }

        carry_context(&mut context, payload);

        let event_time = event.event_time;
        last_event_time = match (last_event_time, event_time) {
            (Some(current), Some(candidate)) if candidate > current => Some(candidate),
            (None, Some(candidate)) => Some(candidate),
            (current, _) => current,
        };
    }

    flags.has_insider_buy_cluster = has_insider_cluster(&insider_buys);

    let score = score_for(&flags);

    ChainRow { lineage_id, flags, context, last_event_time, score }
}

fn carry_context(context: &mut ChainContext, payload: &Value) {
    macro_rules! carry_str {
        ($field:ident) => {
            if context.$field.is_none() {
                if let Some(v) = payload.get(stringify!($field)).and_then(Value::as_str) {
                    context.$field = Some(v.to_string());
                }
            }
        };
    }
    carry_str!(operator);
    carry_str!(region);
    carry_str!(permit_id);
    carry_str!(field);
    carry_str!(county);
    carry_str!(company);
    carry_str!(project);
    carry_str!(commodity);
    carry_str!(company_id);

    if context.tickers.is_none() {
        if let Some(v) = payload.get("tickers") {
            if !v.is_null() {
                context.tickers = Some(v.clone());
            }
        }
    }

    if let Some(candidate) = payload.get("ip_boed").and_then(Value::as_f64) {
        context.ip_boed = Some(match context.ip_boed {
            Some(current) if current >= candidate => current,
            _ => candidate,
        });
    }
}

/// True when at least two distinct filers produced an `insider_buy`
/// within a rolling 30-day window for this lineage.
fn has_insider_cluster(insider_buys: &[(DateTime<Utc>, String)]) -> bool {
    for (i, (time_a, filer_a)) in insider_buys.iter().enumerate() {
        for (time_b, filer_b) in insider_buys.iter().skip(i + 1) {
            if filer_a != filer_b && (*time_a - *time_b).abs() <= Duration::days(INSIDER_CLUSTER_WINDOW_DAYS) {
                return true;
            }
        }
    }
    false
}

fn score_for(flags: &StageFlags) -> f64 {
    let mut score = 0.0;
    if flags.has_permit {
        score += 0.30;
    }
    if flags.has_spud {
        score += 0.20;
    }
    if flags.has_well {
        score += 0.30;
    }
    if flags.has_production {
        score += 0.20;
    }
    if flags.has_resource {
        score += 0.15;
    }
    if flags.has_study {
        score += 0.20;
    }
    if flags.has_deal {
        score += 0.15;
    }
    if flags.has_policy {
        score += 0.10;
    }
    if flags.has_insider_buy {
        score += 0.15;
    }
    if flags.has_insider_buy_cluster {
        score += 0.10;
    }
    (score * 10_000.0).round() / 10_000.0
}

trait AbsDuration {
    fn abs(self) -> Duration;
}

impl AbsDuration for Duration {
    fn abs(self) -> Duration {
        if self < Duration::zero() {
            -self
        } else {
            self
        }
    }
}
