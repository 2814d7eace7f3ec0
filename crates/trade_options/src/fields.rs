//! Cascading dropdown fields and their dependencies.

use common::{Error, Result, TradeCatalog};

use crate::allowed::AllowedCategories;
use crate::markets::MarketTree;
use crate::DropdownOption;

/// Dropdown fields of a trade-parameters block, parent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropdownField {
    Market,
    Submarket,
    Symbol,
    TradeTypeCategory,
    TradeType,
}

impl DropdownField {
    pub fn field_name(self) -> &'static str {
        match self {
            DropdownField::Market => "MARKET_LIST",
            DropdownField::Submarket => "SUBMARKET_LIST",
            DropdownField::Symbol => "SYMBOL_LIST",
            DropdownField::TradeTypeCategory => "TRADETYPECAT_LIST",
            DropdownField::TradeType => "TRADETYPE_LIST",
        }
    }

    /// The field whose options must be regenerated when this one changes.
    pub fn dependent(self) -> Option<Self> {
        match self {
            DropdownField::Market => Some(DropdownField::Submarket),
            DropdownField::Submarket => Some(DropdownField::Symbol),
            DropdownField::Symbol => Some(DropdownField::TradeTypeCategory),
            DropdownField::TradeTypeCategory => Some(DropdownField::TradeType),
            DropdownField::TradeType => None,
        }
    }

    /// Options for this field given the current parent selections.
    pub fn options(
        self,
        tree: &MarketTree,
        catalog: &TradeCatalog,
        allowed: &dyn AllowedCategories,
        selections: &FieldSelections,
    ) -> Result<Vec<DropdownOption>> {
        Ok(match self {
            DropdownField::Market => tree.market_options(allowed),
            DropdownField::Submarket => {
                tree.submarket_options(allowed, selections.market.as_deref())
            }
            DropdownField::Symbol => tree.symbol_options(
                allowed,
                selections.market.as_deref(),
                selections.submarket.as_deref(),
            ),
            DropdownField::TradeTypeCategory => {
                trade_type_category_options(catalog, allowed, selections.symbol.as_deref())
            }
            DropdownField::TradeType => {
                trade_type_options(catalog, selections.trade_type_category.as_deref())?
            }
        })
    }
}

/// Current values of the parent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelections {
    pub market: Option<String>,
    pub submarket: Option<String>,
    pub symbol: Option<String>,
    pub trade_type_category: Option<String>,
}

impl FieldSelections {
    /// Record a new value for `field` and clear every field below it.
    pub fn select(&mut self, field: DropdownField, value: Option<String>) {
        let mut next = Some(field);
        let mut value = value;
        while let Some(f) = next {
            let slot = match f {
                DropdownField::Market => &mut self.market,
                DropdownField::Submarket => &mut self.submarket,
                DropdownField::Symbol => &mut self.symbol,
                DropdownField::TradeTypeCategory => &mut self.trade_type_category,
                DropdownField::TradeType => break,
            };
            *slot = value.take();
            next = f.dependent();
        }
    }
}

/// `(display name, category)` for catalog categories allowed on `symbol`.
pub fn trade_type_category_options(
    catalog: &TradeCatalog,
    allowed: &dyn AllowedCategories,
    symbol: Option<&str>,
) -> Vec<DropdownOption> {
    let Some(symbol) = symbol.filter(|s| !s.is_empty()) else {
        return vec![DropdownOption::empty()];
    };

    let allowed = allowed.allowed_categories(&symbol.to_lowercase());
    catalog
        .category_names
        .iter()
        .filter(|c| allowed.contains(&c.category))
        .map(|c| DropdownOption::new(c.display.clone(), c.category.clone()))
        .collect()
}

/// `(side labels joined by "/", trade type)` for members of `category`.
pub fn trade_type_options(
    catalog: &TradeCatalog,
    category: Option<&str>,
) -> Result<Vec<DropdownOption>> {
    let Some(category) = category.filter(|c| !c.is_empty()) else {
        return Ok(vec![DropdownOption::empty()]);
    };

    let group = catalog
        .contract_category(category)
        .ok_or_else(|| Error::UnknownTradeType(category.to_string()))?;

    group
        .members
        .iter()
        .map(|member| -> Result<DropdownOption> {
            let set = catalog
                .opposites_for(member)
                .ok_or_else(|| Error::UnknownTradeType(member.clone()))?;
            let label = set
                .choices
                .iter()
                .map(|c| c.label.as_str())
                .collect::<Vec<_>>()
                .join("/");
            Ok(DropdownOption::new(label, member.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowed::StaticAllowedCategories;
    use common::ActiveSymbol;

    #[test]
    fn test_dependency_chain() {
        let mut field = DropdownField::Market;
        let mut names = vec![field.field_name()];
        while let Some(next) = field.dependent() {
            names.push(next.field_name());
            field = next;
        }
        assert_eq!(
            names,
            vec![
                "MARKET_LIST",
                "SUBMARKET_LIST",
                "SYMBOL_LIST",
                "TRADETYPECAT_LIST",
                "TRADETYPE_LIST"
            ]
        );
    }

    #[test]
    fn test_select_clears_children() {
        let mut sel = FieldSelections {
            market: Some("forex".into()),
            submarket: Some("major_pairs".into()),
            symbol: Some("frxUSDJPY".into()),
            trade_type_category: Some("callput".into()),
        };
        sel.select(DropdownField::Submarket, Some("minor_pairs".into()));
        assert_eq!(sel.market.as_deref(), Some("forex"));
        assert_eq!(sel.submarket.as_deref(), Some("minor_pairs"));
        assert!(sel.symbol.is_none());
        assert!(sel.trade_type_category.is_none());
    }

    #[test]
    fn test_trade_type_category_options() {
        let catalog = TradeCatalog::default();
        let allowed = StaticAllowedCategories::new().with("R_100", &["digits", "callput"]);
        assert_eq!(
            trade_type_category_options(&catalog, &allowed, Some("R_100")),
            vec![
                DropdownOption::new("Up/Down", "callput"),
                DropdownOption::new("Digits", "digits"),
            ]
        );
        assert_eq!(
            trade_type_category_options(&catalog, &allowed, None),
            vec![DropdownOption::empty()]
        );
    }

    #[test]
    fn test_trade_type_options() {
        let catalog = TradeCatalog::default();
        assert_eq!(
            trade_type_options(&catalog, Some("callput")).unwrap(),
            vec![
                DropdownOption::new("Rise/Fall", "risefall"),
                DropdownOption::new("Higher/Lower", "higherlower"),
            ]
        );
        assert_eq!(
            trade_type_options(&catalog, Some("")).unwrap(),
            vec![DropdownOption::empty()]
        );
        assert!(trade_type_options(&catalog, Some("lookback")).is_err());
    }

    #[test]
    fn test_options_dispatch() {
        let catalog = TradeCatalog::default();
        let allowed = StaticAllowedCategories::new().with("R_100", &["callput"]);
        let tree = MarketTree::from_active_symbols(&[ActiveSymbol {
            symbol: "R_100".into(),
            display_name: "Volatility 100 Index".into(),
            market: "synthetic_index".into(),
            market_display_name: "Synthetic Indices".into(),
            submarket: "random_index".into(),
            submarket_display_name: "Continuous Indices".into(),
        }]);

        let mut sel = FieldSelections::default();
        sel.select(DropdownField::Market, Some("synthetic_index".into()));
        sel.select(DropdownField::Submarket, Some("random_index".into()));

        let symbols = DropdownField::Symbol
            .options(&tree, &catalog, &allowed, &sel)
            .unwrap();
        assert_eq!(symbols, vec![DropdownOption::new("Volatility 100 Index", "R_100")]);

        sel.select(DropdownField::Symbol, Some("R_100".into()));
        let cats = DropdownField::TradeTypeCategory
            .options(&tree, &catalog, &allowed, &sel)
            .unwrap();
        assert_eq!(cats, vec![DropdownOption::new("Up/Down", "callput")]);
    }
}
