//! Purchase choices: which sides of a trade type can be bought.

use common::{Error, Result, TradeCatalog};
use tracing::debug;

use crate::DropdownOption;

/// Contract-type selector meaning "offer every side".
pub const BOTH: &str = "both";

const PLACEHOLDER_LABEL: &str = "Click to select";

/// Sides of `trade_type` matching `contract_type`.
///
/// `contract_type` is either [`BOTH`] or one side's contract type (e.g.
/// `CALL`). When nothing matches, every side is returned.
pub fn filter_purchase_choices(
    catalog: &TradeCatalog,
    contract_type: &str,
    trade_type: &str,
) -> Result<Vec<DropdownOption>> {
    let set = catalog
        .opposites_for(trade_type)
        .ok_or_else(|| Error::UnknownTradeType(trade_type.to_string()))?;

    let mut choices: Vec<_> = set
        .choices
        .iter()
        .filter(|c| contract_type == BOTH || c.contract_type == contract_type)
        .collect();

    if choices.is_empty() {
        debug!(
            "No {} side for {}; offering all sides",
            contract_type, trade_type
        );
        choices = set.choices.iter().collect();
    }

    Ok(choices
        .into_iter()
        .map(|c| DropdownOption::new(c.label.clone(), c.contract_type.clone()))
        .collect())
}

/// The option a purchase field should show after its choices change.
///
/// Keeps the current value when it is still the first choice, or the
/// second of exactly two; otherwise falls back to the first choice.
pub fn reconcile_selection<'a>(
    current_value: &str,
    choices: &'a [DropdownOption],
) -> Option<&'a DropdownOption> {
    let first = choices.first()?;
    if current_value == first.value {
        return Some(first);
    }
    if choices.len() == 2 && current_value == choices[1].value {
        return Some(&choices[1]);
    }
    Some(first)
}

/// Current purchase choices shared by all purchase fields.
#[derive(Debug, Clone)]
pub struct PurchaseChoices {
    choices: Vec<DropdownOption>,
}

impl PurchaseChoices {
    pub fn new() -> Self {
        Self {
            choices: vec![DropdownOption::new(PLACEHOLDER_LABEL, "")],
        }
    }

    pub fn choices(&self) -> &[DropdownOption] {
        &self.choices
    }

    /// Recompute the choices for a new trade type / contract type pair.
    pub fn update(
        &mut self,
        catalog: &TradeCatalog,
        contract_type: &str,
        trade_type: &str,
    ) -> Result<&[DropdownOption]> {
        self.choices = filter_purchase_choices(catalog, contract_type, trade_type)?;
        Ok(&self.choices)
    }

    /// See [`reconcile_selection`].
    pub fn reconcile(&self, current_value: &str) -> Option<&DropdownOption> {
        reconcile_selection(current_value, &self.choices)
    }
}

impl Default for PurchaseChoices {
    fn default() -> Self {
        Self::new()
    }
}
