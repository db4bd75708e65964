//! Market clearing over a bounded price grid.
//!
//! Between consecutive candidate prices (grid points, supply kinks and the
//! demand choke price) both curves are linear, so the root inside the first
//! bracket where excess supply turns non-negative is found exactly by
//! interpolation rather than iteration.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::demand::DemandCurve;
use crate::error::{ConfigError, SimError};
use crate::supply::{Breakdown, SupplyCurve, Technology};

/// What to do when the grid holds no root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampPolicy {
    /// Clamp to the nearer grid boundary and flag the hour.
    #[default]
    Lenient,
    /// Fail the run with [`SimError::EquilibriumNotFound`].
    Strict,
}

/// How an hour cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearingStatus {
    /// Supply and demand intersect inside the grid.
    Cleared,
    /// Supply exceeds demand even at the lowest grid price.
    ClampedLow,
    /// Demand exceeds supply even at the highest grid price.
    ClampedHigh,
}

impl ClearingStatus {
    pub fn is_clamped(self) -> bool {
        !matches!(self, ClearingStatus::Cleared)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClearingStatus::Cleared => "cleared",
            ClearingStatus::ClampedLow => "clamped_low",
            ClearingStatus::ClampedHigh => "clamped_high",
        }
    }
}

impl fmt::Display for ClearingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of clearing one hour.
#[derive(Debug, Clone, PartialEq)]
pub struct Clearing {
    pub price: f64,
    pub quantity: f64,
    pub status: ClearingStatus,
    /// Per-technology dispatch, allocated in merit order; sums to at most `quantity`.
    pub dispatch: Breakdown,
}

/// Sorted, deduplicated, finite price grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceGrid {
    prices: Vec<f64>,
}

impl PriceGrid {
    /// # Errors
    ///
    /// Returns a `ConfigError` for an empty grid or non-finite prices.
    pub fn new(mut prices: Vec<f64>) -> Result<Self, ConfigError> {
        if prices.is_empty() {
            return Err(ConfigError::new("market.price_grid", "must not be empty"));
        }
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(ConfigError::new(
                "market.price_grid",
                "must contain only finite prices",
            ));
        }
        prices.sort_by(f64::total_cmp);
        prices.dedup();
        Ok(Self { prices })
    }

    pub fn min(&self) -> f64 {
        self.prices[0]
    }

    pub fn max(&self) -> f64 {
        self.prices[self.prices.len() - 1]
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }
}

/// Allocates `quantity` to blocks in merit order, each capped at its offer at `price`.
pub fn allocate(supply: &SupplyCurve, price: f64, quantity: f64) -> Breakdown {
    let mut dispatch: Breakdown = Technology::ALL.iter().map(|t| (*t, 0.0)).collect();
    let mut remaining = quantity.max(0.0);
    for b in supply.blocks() {
        let take = b.quantity_at(price).min(remaining).max(0.0);
        *dispatch.entry(b.tech).or_insert(0.0) += take;
        remaining -= take;
    }
    dispatch
}

/// Bracketing equilibrium solver.
#[derive(Debug, Clone)]
pub struct EquilibriumSolver {
    grid: PriceGrid,
    policy: ClampPolicy,
}

impl EquilibriumSolver {
    pub fn new(grid: PriceGrid, policy: ClampPolicy) -> Self {
        Self { grid, policy }
    }

    pub fn grid(&self) -> &PriceGrid {
        &self.grid
    }

    fn candidates(&self, supply: &SupplyCurve, demand: &DemandCurve) -> Vec<f64> {
        let (lo, hi) = (self.grid.min(), self.grid.max());
        let mut c: Vec<f64> = self
            .grid
            .prices()
            .iter()
            .copied()
            .chain(supply.kinks())
            .chain(demand.choke_price())
            .filter(|p| (lo..=hi).contains(p))
            .collect();
        c.sort_by(f64::total_cmp);
        c.dedup();
        c
    }

    /// Clears one hour.
    ///
    /// Inelastic demand resolves ties on a flat supply step to the lowest
    /// qualifying price. Without a root in the grid the result is clamped to
    /// the nearer boundary, or an error under [`ClampPolicy::Strict`].
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EquilibriumNotFound`] for a clamped hour in strict mode.
    pub fn solve(
        &self,
        ts: NaiveDateTime,
        supply: &SupplyCurve,
        demand: &DemandCurve,
    ) -> Result<Clearing, SimError> {
        let excess = |p: f64| supply.total_at(p) - demand.quantity_at(p);
        let candidates = self.candidates(supply, demand);

        let mut prev: Option<(f64, f64)> = None;
        for &p in &candidates {
            let e = excess(p);
            if e < 0.0 {
                prev = Some((p, e));
                continue;
            }
            let d = demand.quantity_at(p);
            let e_below = supply.total_below(p) - d;
            return match prev {
                // Curves cross strictly inside the bracket.
                Some((a, e_a)) if e_below >= 0.0 => {
                    let price = a + (-e_a) / (e_below - e_a) * (p - a);
                    let quantity = demand.quantity_at(price).min(supply.total_at(price));
                    Ok(self.cleared(supply, price, quantity, ClearingStatus::Cleared))
                }
                // Supply steps across demand at `p`.
                Some(_) => Ok(self.cleared(supply, p, d, ClearingStatus::Cleared)),
                None if e_below <= 0.0 => Ok(self.cleared(supply, p, d, ClearingStatus::Cleared)),
                None => self.clamp(ts, supply, p, d, ClearingStatus::ClampedLow),
            };
        }

        let p_max = self.grid.max();
        self.clamp(ts, supply, p_max, supply.total_at(p_max), ClearingStatus::ClampedHigh)
    }

    fn cleared(&self, supply: &SupplyCurve, price: f64, quantity: f64, status: ClearingStatus) -> Clearing {
        Clearing {
            price,
            quantity,
            status,
            dispatch: allocate(supply, price, quantity),
        }
    }

    fn clamp(
        &self,
        ts: NaiveDateTime,
        supply: &SupplyCurve,
        price: f64,
        quantity: f64,
        status: ClearingStatus,
    ) -> Result<Clearing, SimError> {
        match self.policy {
            ClampPolicy::Lenient => Ok(self.cleared(supply, price, quantity, status)),
            ClampPolicy::Strict => Err(SimError::EquilibriumNotFound {
                timestamp: ts,
                reason: match status {
                    ClearingStatus::ClampedLow => format!(
                        "supply exceeds demand at the price floor {price}"
                    ),
                    _ => format!("demand exceeds supply at the price cap {price}"),
                },
            }),
        }
    }
}
