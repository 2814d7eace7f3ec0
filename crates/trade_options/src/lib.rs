//! Dropdown option generation for the strategy editor.
//!
//! Filters the static trade catalog against live market data: purchase
//! choices for a trade type, and the cascading market → submarket →
//! symbol → trade-type-category → trade-type fields.

pub mod allowed;
pub mod fields;
pub mod markets;
pub mod purchase;

use serde::{Deserialize, Serialize};

pub use allowed::{allowed_categories_for, AllowedCategories, StaticAllowedCategories};
pub use fields::{DropdownField, FieldSelections};
pub use markets::{Market, MarketTree, Submarket, SymbolInfo};
pub use purchase::{filter_purchase_choices, reconcile_selection, PurchaseChoices};

/// A `(label, value)` dropdown entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

impl DropdownOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// The `("", "")` entry shown while a parent field is unset.
    pub fn empty() -> Self {
        Self::new("", "")
    }

    /// The `("", "Invalid")` entry shown for an unusable market.
    pub fn invalid() -> Self {
        Self::new("", "Invalid")
    }
}
