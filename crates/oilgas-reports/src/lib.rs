//! Opportunity ranking and observability snapshots over alerts and
//! chains. Pure aggregation over data the caller has
//! already loaded from storage; this crate holds no database handle.

pub mod observability;
pub mod ranker;

pub use observability::{build_snapshot, AlertAggregates, ChainAggregates, ObservabilitySnapshot};
pub use ranker::{rank_opportunities, RankedOpportunity};
