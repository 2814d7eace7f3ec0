//! Static trade-type catalog.
//!
//! Declaration order is significant: dropdowns list categories and trade
//! types in the order they appear here (or in the `[catalog]` section of
//! `config.toml` when overridden).

use serde::{Deserialize, Serialize};

/// A named group of trade types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl CategoryGroup {
    pub fn contains(&self, trade_type: &str) -> bool {
        self.members.iter().any(|m| m == trade_type)
    }
}

/// One side of a trade type (e.g. CALL labelled "Rise").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OppositeChoice {
    pub contract_type: String,
    pub label: String,
}

/// The purchasable sides of a trade type, keyed by the upper-case
/// trade type name (e.g. `RISEFALL`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OppositeSet {
    pub trade_type: String,
    pub choices: Vec<OppositeChoice>,
}

/// Display name for a contract category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryName {
    pub category: String,
    pub display: String,
}

/// Contract-category, barrier-category and opposites tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCatalog {
    /// Contract category → member trade types.
    #[serde(default = "default_contract_categories")]
    pub contract_categories: Vec<CategoryGroup>,

    /// Contract category → display name (only these are offered).
    #[serde(default = "default_category_names")]
    pub category_names: Vec<CategoryName>,

    /// Barrier category → trade types that require it.
    #[serde(default = "default_barrier_categories")]
    pub barrier_categories: Vec<CategoryGroup>,

    /// Trade type → purchasable sides.
    #[serde(default = "default_opposites")]
    pub opposites: Vec<OppositeSet>,
}

impl TradeCatalog {
    /// Resolve the contract category of a trade type: the category named
    /// `trade_type`, or the first one listing it as a member.
    pub fn contract_category_for(&self, trade_type: &str) -> Option<&CategoryGroup> {
        self.contract_categories
            .iter()
            .find(|c| c.name == trade_type || c.contains(trade_type))
    }

    pub fn contract_category(&self, name: &str) -> Option<&CategoryGroup> {
        self.contract_categories.iter().find(|c| c.name == name)
    }

    pub fn category_display_name(&self, category: &str) -> Option<&str> {
        self.category_names
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.display.as_str())
    }

    /// Opposites lookup, case-insensitive on the trade type key.
    pub fn opposites_for(&self, trade_type: &str) -> Option<&OppositeSet> {
        self.opposites
            .iter()
            .find(|o| o.trade_type.eq_ignore_ascii_case(trade_type))
    }
}

impl Default for TradeCatalog {
    fn default() -> Self {
        Self {
            contract_categories: default_contract_categories(),
            category_names: default_category_names(),
            barrier_categories: default_barrier_categories(),
            opposites: default_opposites(),
        }
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn group(name: &str, members: &[&str]) -> CategoryGroup {
    CategoryGroup {
        name: name.into(),
        members: members.iter().map(|m| m.to_string()).collect(),
    }
}

fn opposite(trade_type: &str, choices: &[(&str, &str)]) -> OppositeSet {
    OppositeSet {
        trade_type: trade_type.into(),
        choices: choices
            .iter()
            .map(|(contract_type, label)| OppositeChoice {
                contract_type: contract_type.to_string(),
                label: label.to_string(),
            })
            .collect(),
    }
}

fn default_contract_categories() -> Vec<CategoryGroup> {
    vec![
        group("callput", &["risefall", "higherlower"]),
        group("callputequal", &["risefallequal"]),
        group("touchnotouch", &["touchnotouch"]),
        group("endsinout", &["endsinout"]),
        group("staysinout", &["staysinout"]),
        group("asian", &["asians"]),
        group("digits", &["matchesdiffers", "evenodd", "overunder"]),
        group("reset", &["reset"]),
        group("callputspread", &["callputspread"]),
        group("highlowticks", &["highlowticks"]),
        group("runs", &["runs"]),
    ]
}

fn default_category_names() -> Vec<CategoryName> {
    [
        ("callput", "Up/Down"),
        ("touchnotouch", "Touch/No Touch"),
        ("endsinout", "Ends In/Out"),
        ("staysinout", "Stays In/Goes Out"),
        ("asian", "Asians"),
        ("digits", "Digits"),
        ("reset", "Reset Call/Reset Put"),
        ("callputspread", "Call Spread/Put Spread"),
        ("highlowticks", "High/Low Ticks"),
        ("runs", "Only Ups/Only Downs"),
    ]
    .iter()
    .map(|(category, display)| CategoryName {
        category: category.to_string(),
        display: display.to_string(),
    })
    .collect()
}

fn default_barrier_categories() -> Vec<CategoryGroup> {
    vec![
        group("euro_atm", &["callput", "risefall", "risefallequal", "callputequal"]),
        group("euro_non_atm", &["endsinout", "higherlower"]),
        group("american", &["touchnotouch", "staysinout", "callputspread"]),
        group("non_financial", &["digits", "evenodd", "matchesdiffers", "overunder"]),
        group("asian", &["asians"]),
        group("reset", &["reset"]),
        group("lookback", &["lookback"]),
    ]
}

fn default_opposites() -> Vec<OppositeSet> {
    vec![
        opposite("RISEFALL", &[("CALL", "Rise"), ("PUT", "Fall")]),
        opposite("RISEFALLEQUAL", &[("CALLE", "Rise Equals"), ("PUTE", "Fall Equals")]),
        opposite("HIGHERLOWER", &[("CALL", "Higher"), ("PUT", "Lower")]),
        opposite("TOUCHNOTOUCH", &[("ONETOUCH", "Touch"), ("NOTOUCH", "No Touch")]),
        opposite(
            "ENDSINOUT",
            &[("EXPIRYRANGE", "Ends Between"), ("EXPIRYMISS", "Ends Outside")],
        ),
        opposite("STAYSINOUT", &[("RANGE", "Stays Between"), ("UPORDOWN", "Goes Outside")]),
        opposite("ASIANS", &[("ASIANU", "Asian Up"), ("ASIAND", "Asian Down")]),
        opposite("MATCHESDIFFERS", &[("DIGITMATCH", "Matches"), ("DIGITDIFF", "Differs")]),
        opposite("EVENODD", &[("DIGITEVEN", "Even"), ("DIGITODD", "Odd")]),
        opposite("OVERUNDER", &[("DIGITOVER", "Over"), ("DIGITUNDER", "Under")]),
        opposite("RESET", &[("RESETCALL", "Reset Call"), ("RESETPUT", "Reset Put")]),
        opposite(
            "CALLPUTSPREAD",
            &[("CALLSPREAD", "Call Spread"), ("PUTSPREAD", "Put Spread")],
        ),
        opposite("HIGHLOWTICKS", &[("TICKHIGH", "High Tick"), ("TICKLOW", "Low Tick")]),
        opposite("RUNS", &[("RUNHIGH", "Only Ups"), ("RUNLOW", "Only Downs")]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_by_name_or_member() {
        let catalog = TradeCatalog::default();
        assert_eq!(catalog.contract_category_for("risefall").unwrap().name, "callput");
        assert_eq!(catalog.contract_category_for("callput").unwrap().name, "callput");
        assert_eq!(catalog.contract_category_for("evenodd").unwrap().name, "digits");
        assert!(catalog.contract_category_for("lookback").is_none());
    }

    #[test]
    fn test_opposites_case_insensitive() {
        let catalog = TradeCatalog::default();
        let set = catalog.opposites_for("risefall").unwrap();
        assert_eq!(set.choices[0].contract_type, "CALL");
        assert_eq!(set.choices[1].label, "Fall");
    }

    #[test]
    fn test_every_category_member_has_opposites() {
        let catalog = TradeCatalog::default();
        for category in &catalog.contract_categories {
            for member in &category.members {
                assert!(
                    catalog.opposites_for(member).is_some(),
                    "missing opposites for {}",
                    member
                );
            }
        }
    }
}
