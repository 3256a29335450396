//! End-to-end idempotent double-ingest: ingesting the same REE/uranium
//! fixture twice must process the same row count both times but only
//! insert new rows on the first pass.

use oilgas_index::Database;
use oilgas_providers::common::ingest_fixture_generic;
use oilgas_providers::registry::adapter_for;
use oilgas_universe::Universe;

const FIXTURE: &str = "tests/fixtures/ree_uranium.jsonl";

#[test]
fn idempotent_double_ingest() {
    let db = Database::open_in_memory().unwrap();
    let universe = Universe::empty();
    let adapter = adapter_for("ree_uranium", &universe).unwrap();

    let (inserted_first, processed_first) = ingest_fixture_generic(adapter.as_ref(), FIXTURE, &db).unwrap();
    assert!(processed_first >= 15);
    assert!(inserted_first >= 15);
    assert_eq!(inserted_first, processed_first);

    let (inserted_second, processed_second) = ingest_fixture_generic(adapter.as_ref(), FIXTURE, &db).unwrap();
    assert_eq!(processed_second, processed_first);
    assert_eq!(inserted_second, 0);

    let events = db.load_recent_events(24 * 365).unwrap();
    assert_eq!(events.len() as usize, processed_first);
}

#[test]
fn ingested_events_feed_the_chain_aggregator_to_full_progression() {
    let db = Database::open_in_memory().unwrap();
    let universe = Universe::empty();
    let adapter = adapter_for("ree_uranium", &universe).unwrap();
    ingest_fixture_generic(adapter.as_ref(), FIXTURE, &db).unwrap();

    let events = db.load_recent_events(24 * 365).unwrap();
    let rows = oilgas_engine::compute_chain_scores(&events);

    let borealis = rows
        .iter()
        .find(|row| row.context.company.as_deref() == Some("Borealis Rare Earth"))
        .expect("Borealis lineage present");
    assert!(borealis.flags.has_claims);
    assert!(borealis.flags.has_drill_assay);
    assert!(borealis.flags.has_resource);
    assert!(borealis.flags.has_study);
    assert!(borealis.flags.has_deal);
    assert!(borealis.score >= 1.0);
}
