//! Per-source canonicalization adapters.
//!
//! Each module owns one upstream source's type aliasing, field cleaning,
//! lineage-id derivation, and id construction. `common::ingest_fixture_generic`
//! drives any of them, uniformly, from a JSONL fixture into the storage
//! repository.

pub mod error;
pub mod common;
pub mod traits;
pub mod registry;

pub mod alaska_permits;
pub mod alaska_wells;
pub mod texas_rrc;
pub mod ree_uranium;
pub mod federal_register;
pub mod nprm_congressional;
pub mod sec_edgar;

pub use error::{Error, Result};
pub use traits::SourceAdapter;
pub use registry::{adapter_for, SOURCE_SYSTEMS};
