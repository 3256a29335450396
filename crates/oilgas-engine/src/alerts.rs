//! The alert generator. Tiering thresholds are 0.8/0.5/0.3, and the
//! chain-progression alert-id seed preserves the literal `"AK"` region
//! token for every lineage, Alaska or not.

use chrono::Utc;
use serde_json::{json, Value};

use oilgas_types::{
    chain_progression_alert_id, chain_progression_canonical_doc_id, format_iso_z, Alert, Tier,
    ALERT_EVENT_TYPE_CHAIN_PROGRESSION,
};

use crate::chain::ChainRow;
use crate::convergence::ConvergenceResult;

/// Builds an alert from a chain row and its convergence result, or
/// returns `None` when the row's score falls below the reporting
/// threshold.
pub fn build_alert(row: &ChainRow, convergence: &ConvergenceResult, company_id: Option<&str>) -> Option<Alert> {
    let tier = Tier::for_score(row.score);
    if tier.as_str().is_empty() {
        return None;
    }

    let last_event_time_str = row.last_event_time.map(format_iso_z).unwrap_or_default();
    let utc_date = row.last_event_time.unwrap_or_else(Utc::now).format("%Y-%m-%d").to_string();

    let alert_id = chain_progression_alert_id(&row.lineage_id, &utc_date);
    let canonical_doc_id = chain_progression_canonical_doc_id(&row.lineage_id, &last_event_time_str);

    let actor = row
        .context
        .operator
        .clone()
        .or_else(|| row.context.company.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let region = row.context.region.clone().unwrap_or_default();

    let mut summary = format!(
        "[{}] chain progression {} ({}, {}) score={}",
        tier.as_str().to_uppercase(),
        row.context.permit_id.clone().unwrap_or_else(|| row.lineage_id.clone()),
        actor,
        region,
        row.score,
    );
    if convergence.convergence_score >= 3 {
        summary.push_str(&format!(
            " convergence={} [{}]",
            convergence.convergence_score,
            convergence.convergence_categories.join(",")
        ));
    }

    let evidence_pointer = json!({
        "lineage_id": row.lineage_id,
        "permit_id": row.context.permit_id,
        "operator": row.context.operator,
        "company": row.context.company,
        "region": row.context.region,
        "last_event_time": last_event_time_str,
    });

    let score_summary = json!({
        "score": row.score,
        "flags": row.flags,
        "convergence_score": convergence.convergence_score,
        "convergence_categories": convergence.convergence_categories,
    });

    let details = serde_json::to_value(row).unwrap_or(Value::Null);

    Some(Alert {
        id: None,
        alert_id,
        tier: tier.as_str().to_string(),
        event_type: ALERT_EVENT_TYPE_CHAIN_PROGRESSION.to_string(),
        event_time: row.last_event_time,
        ingest_time: Some(Utc::now()),
        company_id: company_id.map(str::to_string).or_else(|| row.context.company_id.clone()),
        asset_id: None,
        canonical_doc_id,
        evidence_pointer,
        score_summary,
        summary,
        details,
        regime_context: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainContext, StageFlags};

    fn row_with_score(score: f64) -> ChainRow {
        ChainRow {
            lineage_id: "TX:42-301-00001".to_string(),
            flags: StageFlags { has_permit: true, has_well: true, ..Default::default() },
            context: ChainContext {
                operator: Some("Acme Operator".to_string()),
                region: Some("texas".to_string()),
                permit_id: Some("42-301-00001".to_string()),
                ..Default::default()
            },
            last_event_time: Some("2026-01-15T00:00:00Z".parse().unwrap()),
            score,
        }
    }

    fn no_convergence() -> ConvergenceResult {
        ConvergenceResult::default()
    }

    #[test]
    fn alert_id_stable_independent_of_company_id() {
        let row = row_with_score(0.8);
        let a = build_alert(&row, &no_convergence(), Some("C1")).unwrap();
        let b = build_alert(&row, &no_convergence(), None).unwrap();
        assert_eq!(a.alert_id, b.alert_id);
    }

    #[test]
    fn below_threshold_score_is_not_emitted() {
        let row = row_with_score(0.1);
        assert!(build_alert(&row, &no_convergence(), None).is_none());
    }

    #[test]
    fn tier_reflected_in_summary_and_field() {
        let row = row_with_score(0.9);
        let alert = build_alert(&row, &no_convergence(), None).unwrap();
        assert_eq!(alert.tier, "high");
        assert!(alert.summary.starts_with("[HIGH]"));
    }

    #[test]
    fn convergence_suffix_appears_only_at_three_or_more() {
        let row = row_with_score(0.8);
        let weak = ConvergenceResult { convergence_score: 2, convergence_categories: vec!["A".into(), "B".into()] };
        let strong = ConvergenceResult {
            convergence_score: 3,
            convergence_categories: vec!["A".into(), "B".into(), "E".into()],
        };
        let alert_weak = build_alert(&row, &weak, None).unwrap();
        let alert_strong = build_alert(&row, &strong, None).unwrap();
        assert!(!alert_weak.summary.contains("convergence="));
        assert!(alert_strong.summary.contains("convergence=3"));
    }
}
