//! Duration units offered for a contract.

use serde::{Deserialize, Serialize};

/// Duration granularity. Declaration order is the fixed total order
/// ticks < seconds < minutes < hours < days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Ticks,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    /// The default list: every unit, in order.
    pub const ALL: [DurationUnit; 5] = [
        DurationUnit::Ticks,
        DurationUnit::Seconds,
        DurationUnit::Minutes,
        DurationUnit::Hours,
        DurationUnit::Days,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DurationUnit::Ticks => "Ticks",
            DurationUnit::Seconds => "Seconds",
            DurationUnit::Minutes => "Minutes",
            DurationUnit::Hours => "Hours",
            DurationUnit::Days => "Days",
        }
    }

    pub fn code(self) -> char {
        match self {
            DurationUnit::Ticks => 't',
            DurationUnit::Seconds => 's',
            DurationUnit::Minutes => 'm',
            DurationUnit::Hours => 'h',
            DurationUnit::Days => 'd',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.code() == code)
    }

    /// Unit of a duration string such as `"5t"` or `"24h"`: the string
    /// with its digits removed must be exactly one unit code.
    pub fn from_duration(raw: &str) -> Option<Self> {
        let mut letters = raw.trim().chars().filter(|c| !c.is_ascii_digit());
        match (letters.next(), letters.next()) {
            (Some(code), None) => Self::from_code(code),
            _ => None,
        }
    }

    /// Every unit from `min` to `max`, inclusive. Empty when `min > max`.
    pub fn range(min: DurationUnit, max: DurationUnit) -> impl Iterator<Item = DurationUnit> {
        Self::ALL.into_iter().filter(move |u| *u >= min && *u <= max)
    }
}

impl std::fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
