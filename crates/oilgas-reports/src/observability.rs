//! Observability snapshots: aggregate health metrics over
//! recent event and alert windows, for health-check readouts outside
//! this crate's scope.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use oilgas_engine::{ChainRow, ConvergenceResult};
use oilgas_types::Alert;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChainAggregates {
    pub lineage_count: usize,
    pub mean_score: f64,
    pub high_score_count: usize,
    pub insider_count: usize,
    pub convergence_watch_count: usize,
    pub convergence_strong_count: usize,
    pub company_resolution_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertAggregates {
    pub total: usize,
    pub mean_score: f64,
    pub tier_histogram: BTreeMap<String, usize>,
    pub company_resolution_pct: f64,
    pub convergence_strong_count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ObservabilitySnapshot {
    pub source_counts: BTreeMap<String, i64>,
    pub chain: ChainAggregates,
    pub alerts: AlertAggregates,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn pct(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(numerator as f64 / denominator as f64 * 100.0)
}

fn chain_aggregates(rows: &[(ChainRow, ConvergenceResult)]) -> ChainAggregates {
    let lineage_count = rows.len();
    if lineage_count == 0 {
        return ChainAggregates::default();
    }

    let score_sum: f64 = rows.iter().map(|(row, _)| row.score).sum();
    let high_score_count = rows.iter().filter(|(row, _)| row.score >= 0.8).count();
    let insider_count = rows.iter().filter(|(row, _)| row.flags.has_insider_buy).count();
    let convergence_watch_count = rows.iter().filter(|(_, c)| c.convergence_score == 2).count();
    let convergence_strong_count = rows.iter().filter(|(_, c)| c.convergence_score >= 3).count();
    let resolved = rows.iter().filter(|(row, _)| row.context.company_id.is_some()).count();

    ChainAggregates {
        lineage_count,
        mean_score: round2(score_sum / lineage_count as f64),
        high_score_count,
        insider_count,
        convergence_watch_count,
        convergence_strong_count,
        company_resolution_pct: pct(resolved, lineage_count),
    }
}

fn alert_aggregates(alerts: &[Alert]) -> AlertAggregates {
    let total = alerts.len();
    if total == 0 {
        return AlertAggregates::default();
    }

    let score_sum: f64 = alerts.iter().map(|a| a.score_summary.get("score").and_then(Value::as_f64).unwrap_or(0.0)).sum();
    let resolved = alerts.iter().filter(|a| a.company_id.is_some()).count();
    let convergence_strong_count = alerts
        .iter()
        .filter(|a| a.score_summary.get("convergence_score").and_then(Value::as_u64).unwrap_or(0) >= 3)
        .count();

    let mut tier_histogram: BTreeMap<String, usize> = BTreeMap::new();
    for alert in alerts {
        *tier_histogram.entry(alert.tier.clone()).or_insert(0) += 1;
    }

    AlertAggregates {
        total,
        mean_score: round2(score_sum / total as f64),
        tier_histogram,
        company_resolution_pct: pct(resolved, total),
        convergence_strong_count,
    }
}

/// Builds a health snapshot from data already loaded over the desired
/// windows. The caller owns window selection; this crate
/// only aggregates what it is handed.
pub fn build_snapshot(source_counts: BTreeMap<String, i64>, chain_rows: &[(ChainRow, ConvergenceResult)], alerts: &[Alert]) -> ObservabilitySnapshot {
    ObservabilitySnapshot { source_counts, chain: chain_aggregates(chain_rows), alerts: alert_aggregates(alerts) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oilgas_engine::{ChainContext, StageFlags};
    use serde_json::json;

    fn row(score: f64, has_insider_buy: bool, convergence_score: usize, company_id: Option<&str>) -> (ChainRow, ConvergenceResult) {
        (
            ChainRow {
                lineage_id: "TX:1".into(),
                flags: StageFlags { has_insider_buy, ..Default::default() },
                context: ChainContext { company_id: company_id.map(str::to_string), ..Default::default() },
                last_event_time: None,
                score,
            },
            ConvergenceResult { convergence_score, convergence_categories: vec![] },
        )
    }

    fn alert(tier: &str, score: f64, convergence_score: u64, company_id: Option<&str>) -> Alert {
        Alert {
            id: None,
            alert_id: "abc".into(),
            tier: tier.into(),
            event_type: "chain_progression".into(),
            event_time: None,
            ingest_time: None,
            company_id: company_id.map(str::to_string),
            asset_id: None,
            canonical_doc_id: "src:deadbeef".into(),
            evidence_pointer: json!({}),
            score_summary: json!({"score": score, "convergence_score": convergence_score}),
            summary: "s".into(),
            details: json!({}),
            regime_context: None,
        }
    }

    #[test]
    fn empty_inputs_produce_zeroed_aggregates() {
        let snapshot = build_snapshot(BTreeMap::new(), &[], &[]);
        assert_eq!(snapshot.chain.lineage_count, 0);
        assert_eq!(snapshot.alerts.total, 0);
        assert_eq!(snapshot.chain.mean_score, 0.0);
    }

    #[test]
    fn chain_aggregates_count_high_scores_insiders_and_convergence_bands() {
        let rows = vec![
            row(0.9, true, 3, Some("C1")),
            row(0.4, false, 2, None),
            row(0.85, false, 0, Some("C2")),
        ];
        let snapshot = build_snapshot(BTreeMap::new(), &rows, &[]);
        assert_eq!(snapshot.chain.lineage_count, 3);
        assert_eq!(snapshot.chain.high_score_count, 2);
        assert_eq!(snapshot.chain.insider_count, 1);
        assert_eq!(snapshot.chain.convergence_watch_count, 1);
        assert_eq!(snapshot.chain.convergence_strong_count, 1);
        assert_eq!(snapshot.chain.company_resolution_pct, 66.67);
    }

    #[test]
    fn alert_aggregates_build_tier_histogram_and_resolution_rate() {
        let alerts = vec![
            alert("high", 0.9, 3, Some("C1")),
            alert("medium", 0.6, 1, None),
            alert("high", 0.82, 0, Some("C2")),
        ];
        let snapshot = build_snapshot(BTreeMap::new(), &[], &alerts);
        assert_eq!(snapshot.alerts.total, 3);
        assert_eq!(snapshot.alerts.tier_histogram.get("high"), Some(&2));
        assert_eq!(snapshot.alerts.tier_histogram.get("medium"), Some(&1));
        assert_eq!(snapshot.alerts.convergence_strong_count, 1);
        assert_eq!(snapshot.alerts.company_resolution_pct, 66.67);
    }

    #[test]
    fn source_counts_pass_through_unmodified() {
        let mut counts = BTreeMap::new();
        counts.insert("alaska_permits".to_string(), 4);
        let snapshot = build_snapshot(counts.clone(), &[], &[]);
        assert_eq!(snapshot.source_counts, counts);
    }
}
