//! The opportunity ranker: joins recent alerts with universe
//! metadata (tickers) and orders them by a blended recency/severity
//! score for presentation layers outside this crate's scope.

use chrono::{DateTime, Utc};
use serde_json::Value;

use oilgas_types::Alert;
use oilgas_universe::Universe;

#[derive(Debug, Clone)]
pub struct RankedOpportunity {
    pub alert_id: String,
    pub summary: String,
    pub tier: String,
    pub company_id: Option<String>,
    pub tickers: Vec<String>,
    pub event_time: Option<DateTime<Utc>>,
    pub opportunity_score: f64,
}

fn tier_weight(tier: &str) -> f64 {
    match tier {
        "high" => 1.0,
        "medium" => 0.6,
        "low" => 0.4,
        _ => 0.0,
    }
}

/// Age-bucketed recency boost relative to `now`. A null
/// `event_time` contributes zero.
fn recency_boost(event_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(event_time) = event_time else { return 0.0 };
    let age_hours = (now - event_time).num_seconds() as f64 / 3600.0;
    if age_hours <= 6.0 {
        0.25
    } else if age_hours <= 24.0 {
        0.10
    } else {
        0.02
    }
}

fn chain_score_of(alert: &Alert) -> f64 {
    alert.score_summary.get("score").and_then(Value::as_f64).unwrap_or(0.0)
}

fn tickers_for(universe: &Universe, company_id: Option<&str>) -> Vec<String> {
    if let Some(id) = company_id {
        if let Some(company) = universe.company_by_id(id) {
            return company.tickers.clone();
        }
        return Vec::new();
    }
    if universe.companies.len() == 1 {
        return universe.companies[0].tickers.clone();
    }
    Vec::new()
}

/// Resolves the company to attach tickers for: the alert's own
/// `company_id` when set, otherwise the universe's single company when
/// it has exactly one — an alert with no company attribution still gets
/// tickers when the universe is unambiguous.
fn effective_company_id<'a>(alert: &'a Alert, universe: &'a Universe) -> Option<&'a str> {
    if let Some(id) = alert.company_id.as_deref() {
        return Some(id);
    }
    if universe.companies.len() == 1 {
        return Some(universe.companies[0].company_id.as_str());
    }
    None
}

/// Ranks recent alerts into opportunities, highest `opportunity_score`
/// first, deduped by `(summary, company_id, tier)`, truncated to the top
/// `top_n`.
pub fn rank_opportunities(alerts: &[Alert], universe: &Universe, top_n: usize, now: DateTime<Utc>) -> Vec<RankedOpportunity> {
    let mut ranked: Vec<RankedOpportunity> = alerts
        .iter()
        .map(|alert| {
            let company_id = effective_company_id(alert, universe).map(str::to_string);
            let opportunity_score = tier_weight(&alert.tier).max(chain_score_of(alert)) + recency_boost(alert.event_time, now);
            RankedOpportunity {
                alert_id: alert.alert_id.clone(),
                summary: alert.summary.clone(),
                tier: alert.tier.clone(),
                tickers: tickers_for(universe, company_id.as_deref()),
                company_id,
                event_time: alert.event_time,
                opportunity_score,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.opportunity_score.partial_cmp(&a.opportunity_score).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen = std::collections::HashSet::new();
    ranked.retain(|row| seen.insert((row.summary.clone(), row.company_id.clone(), row.tier.clone())));

    ranked.truncate(top_n);
    ranked
}
