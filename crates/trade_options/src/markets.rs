//! Market → submarket → symbol tree built from `active_symbols`.
//!
//! A symbol is active when it has at least one allowed category; a
//! submarket when it holds an active symbol; a market when it holds an
//! active submarket. Dropdowns only ever list active nodes.

use common::ActiveSymbol;

use crate::allowed::AllowedCategories;
use crate::DropdownOption;

const INVALID: &str = "Invalid";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub symbol: String,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submarket {
    pub key: String,
    pub name: String,
    pub symbols: Vec<SymbolInfo>,
}

impl Submarket {
    pub fn active_symbols<'a>(
        &'a self,
        allowed: &'a dyn AllowedCategories,
    ) -> impl Iterator<Item = &'a SymbolInfo> + 'a {
        self.symbols.iter().filter(move |s| allowed.is_active(&s.symbol))
    }

    pub fn is_active(&self, allowed: &dyn AllowedCategories) -> bool {
        self.active_symbols(allowed).next().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    pub key: String,
    pub name: String,
    pub submarkets: Vec<Submarket>,
}

impl Market {
    pub fn active_submarkets<'a>(
        &'a self,
        allowed: &'a dyn AllowedCategories,
    ) -> impl Iterator<Item = &'a Submarket> + 'a {
        self.submarkets.iter().filter(move |s| s.is_active(allowed))
    }

    pub fn is_active(&self, allowed: &dyn AllowedCategories) -> bool {
        self.active_submarkets(allowed).next().is_some()
    }

    fn submarket(&self, key: &str) -> Option<&Submarket> {
        self.submarkets.iter().find(|s| s.key == key)
    }
}

/// Ordered market tree. Nodes keep first-seen order from the source list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketTree {
    pub markets: Vec<Market>,
}

impl MarketTree {
    pub fn from_active_symbols(symbols: &[ActiveSymbol]) -> Self {
        let mut tree = MarketTree::default();

        for s in symbols {
            let market_idx = match tree.markets.iter().position(|m| m.key == s.market) {
                Some(idx) => idx,
                None => {
                    tree.markets.push(Market {
                        key: s.market.clone(),
                        name: s.market_display_name.clone(),
                        submarkets: Vec::new(),
                    });
                    tree.markets.len() - 1
                }
            };
            let market = &mut tree.markets[market_idx];

            let sub_idx = match market.submarkets.iter().position(|m| m.key == s.submarket) {
                Some(idx) => idx,
                None => {
                    market.submarkets.push(Submarket {
                        key: s.submarket.clone(),
                        name: s.submarket_display_name.clone(),
                        symbols: Vec::new(),
                    });
                    market.submarkets.len() - 1
                }
            };
            let submarket = &mut market.submarkets[sub_idx];

            if !submarket.symbols.iter().any(|x| x.symbol == s.symbol) {
                submarket.symbols.push(SymbolInfo {
                    symbol: s.symbol.clone(),
                    display: s.display_name.clone(),
                });
            }
        }

        tree
    }

    pub fn market(&self, key: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.key == key)
    }

    /// Every symbol in the tree, active or not.
    pub fn symbols(&self) -> impl Iterator<Item = &SymbolInfo> {
        self.markets
            .iter()
            .flat_map(|m| m.submarkets.iter())
            .flat_map(|s| s.symbols.iter())
    }

    /// `(name, key)` for every active market.
    pub fn market_options(&self, allowed: &dyn AllowedCategories) -> Vec<DropdownOption> {
        self.markets
            .iter()
            .filter(|m| m.is_active(allowed))
            .map(|m| DropdownOption::new(m.name.clone(), m.key.clone()))
            .collect()
    }

    /// `(name, key)` for the active submarkets of `market`.
    pub fn submarket_options(
        &self,
        allowed: &dyn AllowedCategories,
        market: Option<&str>,
    ) -> Vec<DropdownOption> {
        let active_market = market
            .filter(|m| !m.is_empty() && *m != INVALID)
            .and_then(|m| self.market(m))
            .filter(|m| m.is_active(allowed));

        match active_market {
            Some(m) => m
                .active_submarkets(allowed)
                .map(|s| DropdownOption::new(s.name.clone(), s.key.clone()))
                .collect(),
            None => vec![DropdownOption::invalid()],
        }
    }

    /// `(display, symbol)` for the active symbols of `market`/`submarket`.
    pub fn symbol_options(
        &self,
        allowed: &dyn AllowedCategories,
        market: Option<&str>,
        submarket: Option<&str>,
    ) -> Vec<DropdownOption> {
        let Some(submarket) = submarket.filter(|s| !s.is_empty() && *s != INVALID) else {
            return vec![DropdownOption::empty()];
        };

        let active_submarket = market
            .and_then(|m| self.market(m))
            .filter(|m| m.is_active(allowed))
            .and_then(|m| m.submarket(submarket))
            .filter(|s| s.is_active(allowed));

        match active_submarket {
            Some(s) => s
                .active_symbols(allowed)
                .map(|x| DropdownOption::new(x.display.clone(), x.symbol.clone()))
                .collect(),
            None => vec![DropdownOption::empty()],
        }
    }
}
