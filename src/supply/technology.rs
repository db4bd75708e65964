//! Generation technologies and their per-hour descriptors.

use std::fmt;

use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;

use crate::config::OutageConfig;
use crate::sim::types::ResolvedValues;

/// Default bid band for price-taking technologies (currency/MWh).
pub const DEFAULT_BID_MIN: f64 = -200.0;
pub const DEFAULT_BID_MAX: f64 = -50.0;

/// Generation technology.
///
/// Declaration order is the merit-order tie-break priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    Nuclear,
    Wind,
    Solar,
    Coal,
    Gas,
}

impl Technology {
    /// All technologies in priority order.
    pub const ALL: [Technology; 5] = [
        Technology::Nuclear,
        Technology::Wind,
        Technology::Solar,
        Technology::Coal,
        Technology::Gas,
    ];

    /// Lowercase key used in variable names (`cap.<key>`).
    pub fn key(self) -> &'static str {
        match self {
            Technology::Nuclear => "nuclear",
            Technology::Wind => "wind",
            Technology::Solar => "solar",
            Technology::Coal => "coal",
            Technology::Gas => "gas",
        }
    }

    /// Priced from fuel cost and efficiency rather than a bid band.
    pub fn is_thermal(self) -> bool {
        matches!(self, Technology::Coal | Technology::Gas)
    }

    /// Subject to planned outages.
    pub fn has_outages(self) -> bool {
        matches!(self, Technology::Nuclear | Technology::Coal | Technology::Gas)
    }

    fn outage_reduction(self, outages: &OutageConfig) -> f64 {
        match self {
            Technology::Nuclear => outages.nuclear_reduction,
            Technology::Coal => outages.coal_reduction,
            Technology::Gas => outages.gas_reduction,
            Technology::Wind | Technology::Solar => 0.0,
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Resolved inputs for one technology in one hour.
#[derive(Debug, Clone, PartialEq)]
pub struct TechnologyDescriptor {
    pub tech: Technology,
    /// Nameplate capacity (MW), floored at 0.
    pub capacity: f64,
    /// Availability after outage derating, floored at 0.
    pub availability: f64,
    /// Fuel price (thermal only).
    pub fuel_price: Option<f64>,
    /// Efficiency bounds `(eta_lb, eta_ub)` (thermal only).
    pub efficiency: Option<(f64, f64)>,
    /// Bid band `(bid.min, bid.max)` (non-thermal only).
    pub bid: Option<(f64, f64)>,
}

fn value(values: &ResolvedValues, key: &str) -> Option<f64> {
    values.get(key).copied().filter(|v| v.is_finite())
}

impl TechnologyDescriptor {
    /// Reads `cap.*`, `avail.*`, `fuel.*`, `eta_lb.*`, `eta_ub.*` and `bid.*.{min,max}`
    /// for `tech` and applies planned outages for the month of `ts`.
    pub fn resolve(
        tech: Technology,
        ts: NaiveDateTime,
        values: &ResolvedValues,
        outages: &OutageConfig,
    ) -> Self {
        let key = tech.key();
        let capacity = value(values, &format!("cap.{key}")).unwrap_or(0.0).max(0.0);
        let mut availability = value(values, &format!("avail.{key}")).unwrap_or(0.0).max(0.0);
        if outages.enabled && tech.has_outages() && outages.months.contains(&ts.month()) {
            availability *= 1.0 - tech.outage_reduction(outages);
        }

        if tech.is_thermal() {
            Self {
                tech,
                capacity,
                availability,
                fuel_price: Some(value(values, &format!("fuel.{key}")).unwrap_or(0.0)),
                efficiency: Some((
                    value(values, &format!("eta_lb.{key}")).unwrap_or(0.0),
                    value(values, &format!("eta_ub.{key}")).unwrap_or(0.0),
                )),
                bid: None,
            }
        } else {
            Self {
                tech,
                capacity,
                availability,
                fuel_price: None,
                efficiency: None,
                bid: Some((
                    value(values, &format!("bid.{key}.min")).unwrap_or(DEFAULT_BID_MIN),
                    value(values, &format!("bid.{key}.max")).unwrap_or(DEFAULT_BID_MAX),
                )),
            }
        }
    }

    /// Deliverable quantity: capacity × effective availability.
    pub fn available_quantity(&self) -> f64 {
        self.capacity * self.availability
    }

    /// Price band `(low, high)` over which the block's quantity is offered.
    ///
    /// Thermal: `[fuel / eta_max, fuel / eta_min]`; equal bounds give a single
    /// step. Returns `None` when a thermal efficiency is not positive.
    pub fn price_band(&self) -> Option<(f64, f64)> {
        let (lo, hi) = match (self.fuel_price, self.efficiency, self.bid) {
            (Some(fuel), Some((eta_a, eta_b)), _) => {
                if eta_a <= 0.0 || eta_b <= 0.0 {
                    return None;
                }
                let (eta_min, eta_max) = (eta_a.min(eta_b), eta_a.max(eta_b));
                (fuel / eta_max, fuel / eta_min)
            }
            (_, _, Some((a, b))) => (a, b),
            _ => return None,
        };
        Some((lo.min(hi), lo.max(hi)))
    }
}
