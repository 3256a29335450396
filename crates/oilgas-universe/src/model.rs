//! The entity universe: companies, assets, and named watchlists.
//! Loaded once per invocation and treated as a read-only lookup table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub company_id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub tickers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: String,
    pub name: String,
    #[serde(default)]
    pub company_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Universe {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub watchlists: BTreeMap<String, Vec<String>>,
}

impl Universe {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn company_by_id(&self, company_id: &str) -> Option<&Company> {
        self.companies.iter().find(|c| c.company_id == company_id)
    }
}
