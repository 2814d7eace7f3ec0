//! Duration units offered by a contract list for one trade type.

use std::collections::BTreeSet;

use common::{ContractDescriptor, TradeCatalog};
use tracing::debug;

use crate::unit::DurationUnit;

/// Max duration of a daily contract that is actually bounded in hours.
const ONE_DAY: &str = "1d";
const ONE_DAY_IN_HOURS: &str = "24h";

/// Barrier policy: the first barrier group listing `trade_type` decides
/// which barrier category a contract needs. Trade types no group lists
/// accept every barrier category.
fn meets_barrier_conditions(
    contract: &ContractDescriptor,
    trade_type: &str,
    catalog: &TradeCatalog,
) -> bool {
    match catalog
        .barrier_categories
        .iter()
        .find(|group| group.contains(trade_type))
    {
        Some(group) => contract.barrier_category == group.name,
        None => true,
    }
}

fn unit_range(contract: &ContractDescriptor) -> Option<(DurationUnit, DurationUnit)> {
    let max_raw = if contract.max_contract_duration == ONE_DAY {
        ONE_DAY_IN_HOURS
    } else {
        contract.max_contract_duration.as_str()
    };

    let min = DurationUnit::from_duration(&contract.min_contract_duration)?;
    let max = DurationUnit::from_duration(max_raw)?;
    Some((min, max))
}

/// Duration units `contracts` offer for `trade_type`, ascending.
///
/// An empty contract list means "no data" and yields every unit.
pub fn compute_durations(
    contracts: &[ContractDescriptor],
    trade_type: &str,
    catalog: &TradeCatalog,
) -> Vec<DurationUnit> {
    if contracts.is_empty() {
        return DurationUnit::ALL.to_vec();
    }

    let Some(category) = catalog.contract_category_for(trade_type) else {
        debug!("No contract category for trade type {}", trade_type);
        return Vec::new();
    };

    let matching: Vec<&ContractDescriptor> = contracts
        .iter()
        .filter(|c| !c.is_forward_starting())
        .filter(|c| c.contract_category == category.name)
        .filter(|c| meets_barrier_conditions(c, trade_type, catalog))
        .collect();

    let mut offered = BTreeSet::new();
    for contract in &matching {
        match unit_range(contract) {
            Some((min, max)) => offered.extend(DurationUnit::range(min, max)),
            None => debug!(
                "Skipping contract {} with unparseable durations {}..{}",
                contract.contract_type,
                contract.min_contract_duration,
                contract.max_contract_duration
            ),
        }
    }

    if matching.iter().all(|c| c.is_intraday()) {
        offered.remove(&DurationUnit::Days);
    }

    offered.into_iter().collect()
}
