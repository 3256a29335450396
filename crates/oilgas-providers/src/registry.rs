//! Lookup of adapters by `source_system` name.

use oilgas_universe::Universe;

use crate::traits::SourceAdapter;
use crate::{
    alaska_permits::AlaskaPermitsAdapter, alaska_wells::AlaskaWellsAdapter,
    federal_register::FederalRegisterAdapter, nprm_congressional::NprmCongressionalAdapter,
    ree_uranium::ReeUraniumAdapter, sec_edgar::SecEdgarAdapter, texas_rrc::TexasRrcAdapter,
};
use crate::{Error, Result};

/// `source_system` names handled by this crate.
pub const SOURCE_SYSTEMS: &[&str] = &[
    "alaska_permits",
    "alaska_wells",
    "tx_rrc",
    "sec_edgar",
    "federal_register_rules",
    "nprm_congressional",
    "ree_uranium",
];

/// Builds the adapter for a `source_system` name. Company-resolving
/// adapters borrow `universe` for the lifetime of the call; sources with
/// no resolution step (Alaska, Texas, REE/uranium) simply ignore it.
pub fn adapter_for<'u>(name: &str, universe: &'u Universe) -> Result<Box<dyn SourceAdapter + 'u>> {
    match name {
        "alaska_permits" => Ok(Box::new(AlaskaPermitsAdapter)),
        "alaska_wells" => Ok(Box::new(AlaskaWellsAdapter)),
        "tx_rrc" => Ok(Box::new(TexasRrcAdapter)),
        "sec_edgar" => Ok(Box::new(SecEdgarAdapter::new(universe))),
        "federal_register_rules" => Ok(Box::new(FederalRegisterAdapter::new(universe))),
        "nprm_congressional" => Ok(Box::new(NprmCongressionalAdapter::new(universe))),
        "ree_uranium" => Ok(Box::new(ReeUraniumAdapter)),
        other => Err(Error::UnknownAdapter(other.to_string())),
    }
}
