//! YAML-file loading of the universe document. Deliberately thin: file
//! I/O and YAML-loading mechanics are an external collaborator's
//! concern, not part of the domain core.

use std::path::Path;

use crate::error::Result;
use crate::model::Universe;

/// Loads a `Universe` from a YAML document on disk.
pub fn load_universe(path: impl AsRef<Path>) -> Result<Universe> {
    let contents = std::fs::read_to_string(path)?;
    load_universe_str(&contents)
}

/// Parses a `Universe` from an in-memory YAML document (used by tests and
/// by callers that already hold the document contents).
pub fn load_universe_str(contents: &str) -> Result<Universe> {
    Ok(serde_yaml::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_universe_document() {
        let doc = r#"
companies:
  - company_id: "C1"
    name: "Permian Resources"
    aliases: ["Permian Resources Corp"]
    tickers: ["PR"]
assets: []
watchlists:
  permian: ["C1"]
"#;
        let universe = load_universe_str(doc).unwrap();
        assert_eq!(universe.companies.len(), 1);
        assert_eq!(universe.companies[0].company_id, "C1");
        assert_eq!(universe.watchlists.get("permian").unwrap(), &vec!["C1".to_string()]);
    }
}
