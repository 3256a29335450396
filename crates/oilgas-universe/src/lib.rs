//! The entity universe and free-text resolver.

pub mod error;
pub mod loader;
pub mod model;
pub mod resolve;

pub use error::{Error, Result};
pub use loader::{load_universe, load_universe_str};
pub use model::{Asset, Company, Universe};
pub use resolve::{resolve_company, Resolution, ResolutionMethod};
