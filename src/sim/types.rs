//! Core simulation types: resolved values and per-hour output records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;

use crate::equilibrium::ClearingStatus;
use crate::supply::{Breakdown, Technology};

/// Variable name to value for one hour, e.g. `"fuel.gas" -> 31.2`.
pub type ResolvedValues = BTreeMap<String, f64>;

/// Variable name to active regime label for one hour.
pub type RegimeLabels = BTreeMap<String, String>;

/// Complete record of one simulated hour.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    /// Start of the hour.
    pub timestamp: NaiveDateTime,
    /// Clearing price (currency/MWh).
    pub price: f64,
    /// Clearing quantity (MW).
    pub quantity: f64,
    /// Whether the price was clamped to a grid boundary.
    pub status: ClearingStatus,
    /// Dispatched quantity per technology (MW).
    pub dispatch: Breakdown,
    /// Capacity × effective availability per technology (MW).
    pub available: Breakdown,
    /// Resolved variable values, including weather-driven availability.
    pub values: ResolvedValues,
    /// Active regime per variable.
    pub regimes: RegimeLabels,
}

impl OutputRecord {
    /// Dispatch of one technology (0 if absent).
    pub fn dispatch_of(&self, tech: Technology) -> f64 {
        self.dispatch.get(&tech).copied().unwrap_or(0.0)
    }

    /// Sum of dispatch over all technologies.
    pub fn total_dispatch(&self) -> f64 {
        self.dispatch.values().sum()
    }

    /// Sum of available quantity over all technologies.
    pub fn total_available(&self) -> f64 {
        self.available.values().sum()
    }
}

impl fmt::Display for OutputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | price={:>8.2}  qty={:>9.1} [{}] |",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.price,
            self.quantity,
            self.status,
        )?;
        for tech in Technology::ALL {
            write!(f, " {}={:.1}", tech, self.dispatch_of(tech))?;
        }
        Ok(())
    }
}
