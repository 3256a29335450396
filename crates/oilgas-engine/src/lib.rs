//! Chain aggregation, convergence scoring, and alert generation.
//! This layer sits between normalized events (oilgas-types/oilgas-index) and
//! presentation (oilgas-reports, the CLI).

mod alerts;
mod chain;
mod convergence;

pub use alerts::build_alert;
pub use chain::{compute_chain_scores, ChainContext, ChainRow, StageFlags};
pub use convergence::{category_for_type, enrich_with_convergence, Category, ConvergenceResult, DEFAULT_WINDOW_DAYS};
