//! Allowed trade-type categories per symbol.

use std::collections::HashMap;

use common::{ContractDescriptor, TradeCatalog};

/// Live lookup of the contract categories a symbol can be traded with.
pub trait AllowedCategories {
    /// Categories allowed for `symbol`; empty when the symbol is unknown
    /// or has nothing tradable.
    fn allowed_categories(&self, symbol: &str) -> Vec<String>;

    fn is_active(&self, symbol: &str) -> bool {
        !self.allowed_categories(symbol).is_empty()
    }
}

/// Catalog categories offered by `contracts`, in catalog order.
///
/// Forward-starting contracts are ignored, as are categories the catalog
/// does not list.
pub fn allowed_categories_for(
    contracts: &[ContractDescriptor],
    catalog: &TradeCatalog,
) -> Vec<String> {
    catalog
        .contract_categories
        .iter()
        .filter(|category| {
            contracts
                .iter()
                .any(|c| !c.is_forward_starting() && c.contract_category == category.name)
        })
        .map(|category| category.name.clone())
        .collect()
}

/// Fixed symbol → categories table. Symbol keys are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct StaticAllowedCategories {
    by_symbol: HashMap<String, Vec<String>>,
}

impl StaticAllowedCategories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, categories: Vec<String>) {
        self.by_symbol.insert(symbol.to_lowercase(), categories);
    }

    pub fn with(mut self, symbol: &str, categories: &[&str]) -> Self {
        self.insert(symbol, categories.iter().map(|c| c.to_string()).collect());
        self
    }
}

impl AllowedCategories for StaticAllowedCategories {
    fn allowed_categories(&self, symbol: &str) -> Vec<String> {
        self.by_symbol
            .get(&symbol.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}
