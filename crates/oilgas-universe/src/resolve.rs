//! Free-text company resolution against a loaded universe.
//! Pure, deterministic, no network access, no learning.

use oilgas_types::normalize_text;

use crate::model::Universe;

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionMethod {
    Alias,
    Fallback,
    None,
}

impl ResolutionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMethod::Alias => "alias",
            ResolutionMethod::Fallback => "fallback",
            ResolutionMethod::None => "none",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub company_id: Option<String>,
    pub method: ResolutionMethod,
    pub confidence: f64,
}

impl Resolution {
    fn none() -> Self {
        Self { company_id: None, method: ResolutionMethod::None, confidence: 0.0 }
    }
}

/// Resolves free-text `name`/`operator` mentions to a company identity.
///
/// Lookup policy (first match wins; `name` tried before `operator`):
/// 1. Exact normalized match against canonical name or any alias.
/// 2. Single-company universe fallback.
/// 3. No match.
pub fn resolve_company(universe: &Universe, name: Option<&str>, operator: Option<&str>) -> Resolution {
    for candidate in [name, operator].into_iter().flatten() {
        let normalized = normalize_text(candidate);
        if normalized.is_empty() {
            continue;
        }
        if let Some(company) = find_exact_match(universe, &normalized) {
            return Resolution {
                company_id: Some(company.company_id.clone()),
                method: ResolutionMethod::Alias,
                confidence: 0.95,
            };
        }
    }

    if universe.companies.len() == 1 {
        return Resolution {
            company_id: Some(universe.companies[0].company_id.clone()),
            method: ResolutionMethod::Fallback,
            confidence: 0.25,
        };
    }

    Resolution::none()
}

fn find_exact_match<'a>(universe: &'a Universe, normalized: &str) -> Option<&'a crate::model::Company> {
    universe.companies.iter().find(|company| {
        normalize_text(&company.name) == normalized
            || company.aliases.iter().any(|alias| normalize_text(alias) == normalized)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Company;

    fn universe_with(companies: Vec<Company>) -> Universe {
        Universe { companies, assets: vec![], watchlists: Default::default() }
    }

    #[test]
    fn exact_name_match_is_high_confidence() {
        let universe = universe_with(vec![Company {
            company_id: "C1".into(),
            name: "Permian Resources".into(),
            aliases: vec![],
            tickers: vec![],
        }]);
        let resolution = resolve_company(&universe, Some("Permian Resources"), None);
        assert_eq!(resolution.company_id.as_deref(), Some("C1"));
        assert_eq!(resolution.method, ResolutionMethod::Alias);
        assert_eq!(resolution.confidence, 0.95);
    }

    #[test]
    fn alias_match_counts_as_alias_method() {
        let universe = universe_with(vec![Company {
            company_id: "C1".into(),
            name: "Permian Resources Corporation".into(),
            aliases: vec!["PR Corp".into()],
            tickers: vec![],
        }]);
        let resolution = resolve_company(&universe, Some("pr corp"), None);
        assert_eq!(resolution.company_id.as_deref(), Some("C1"));
        assert_eq!(resolution.method, ResolutionMethod::Alias);
    }

    #[test]
    fn operator_tried_after_name() {
        let universe = universe_with(vec![Company {
            company_id: "C1".into(),
            name: "Conoco Operator LLC".into(),
            aliases: vec![],
            tickers: vec![],
        }]);
        let resolution = resolve_company(&universe, Some("unresolvable co"), Some("Conoco Operator LLC"));
        assert_eq!(resolution.company_id.as_deref(), Some("C1"));
    }

    #[test]
    fn single_company_universe_falls_back() {
        let universe = universe_with(vec![Company {
            company_id: "ONLY".into(),
            name: "Only Company".into(),
            aliases: vec![],
            tickers: vec![],
        }]);
        let resolution = resolve_company(&universe, Some("completely unrelated text"), None);
        assert_eq!(resolution.company_id.as_deref(), Some("ONLY"));
        assert_eq!(resolution.method, ResolutionMethod::Fallback);
        assert_eq!(resolution.confidence, 0.25);
    }

    #[test]
    fn no_match_with_multiple_companies() {
        let universe = universe_with(vec![
            Company { company_id: "A".into(), name: "Alpha Corp".into(), aliases: vec![], tickers: vec![] },
            Company { company_id: "B".into(), name: "Beta Corp".into(), aliases: vec![], tickers: vec![] },
        ]);
        let resolution = resolve_company(&universe, Some("gamma corp"), None);
        assert!(resolution.company_id.is_none());
        assert_eq!(resolution.method, ResolutionMethod::None);
        assert_eq!(resolution.confidence, 0.0);
    }

    #[test]
    fn resolver_is_pure_and_deterministic() {
        let universe = universe_with(vec![Company {
            company_id: "C1".into(),
            name: "Permian Resources".into(),
            aliases: vec![],
            tickers: vec![],
        }]);
        let a = resolve_company(&universe, Some("Permian Resources"), None);
        let b = resolve_company(&universe, Some("Permian Resources"), None);
        assert_eq!(a.company_id, b.company_id);
        assert_eq!(a.confidence, b.confidence);
    }
}
