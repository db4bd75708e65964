//! Merit-order supply curve for one hour.

use std::collections::BTreeMap;

use crate::supply::technology::{Technology, TechnologyDescriptor};

/// Quantity offered by one technology, spread uniformly over `[p_lo, p_hi]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub tech: Technology,
    pub quantity: f64,
    pub p_lo: f64,
    pub p_hi: f64,
}

impl Block {
    /// Offered quantity at `price`; a zero-width band offers everything at `p_lo`.
    pub fn quantity_at(&self, price: f64) -> f64 {
        if price < self.p_lo {
            0.0
        } else if price >= self.p_hi {
            self.quantity
        } else {
            self.quantity * (price - self.p_lo) / (self.p_hi - self.p_lo)
        }
    }

    /// Offered quantity just below `price` (left limit).
    pub fn quantity_below(&self, price: f64) -> f64 {
        if price <= self.p_lo {
            0.0
        } else if price > self.p_hi {
            self.quantity
        } else {
            self.quantity * (price - self.p_lo) / (self.p_hi - self.p_lo)
        }
    }
}

/// Per-technology quantities.
pub type Breakdown = BTreeMap<Technology, f64>;

/// Non-decreasing supply function assembled from technology blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyCurve {
    blocks: Vec<Block>,
    available: Breakdown,
}

impl SupplyCurve {
    /// Assembles blocks in merit order: ascending band, ties by technology priority.
    ///
    /// Technologies with no quantity or no valid band contribute nothing.
    pub fn from_descriptors(descriptors: &[TechnologyDescriptor]) -> Self {
        let mut available = Breakdown::new();
        let mut blocks = Vec::with_capacity(descriptors.len());
        for d in descriptors {
            let q = d.available_quantity();
            available.insert(d.tech, q);
            if q <= 0.0 || !q.is_finite() {
                continue;
            }
            if let Some((p_lo, p_hi)) = d.price_band() {
                if p_lo.is_finite() && p_hi.is_finite() {
                    blocks.push(Block {
                        tech: d.tech,
                        quantity: q,
                        p_lo,
                        p_hi,
                    });
                }
            }
        }
        blocks.sort_by(|a, b| {
            a.p_lo
                .total_cmp(&b.p_lo)
                .then(a.p_hi.total_cmp(&b.p_hi))
                .then(a.tech.cmp(&b.tech))
        });
        Self { blocks, available }
    }

    /// Blocks in merit order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Capacity × effective availability per technology.
    pub fn available(&self) -> &Breakdown {
        &self.available
    }

    /// Sum of all deliverable quantities.
    pub fn total_available(&self) -> f64 {
        self.available.values().sum()
    }

    /// Total quantity offered at `price` and the per-technology split.
    pub fn quantity_at(&self, price: f64) -> (f64, Breakdown) {
        let mut breakdown: Breakdown = Technology::ALL.iter().map(|t| (*t, 0.0)).collect();
        let mut total = 0.0;
        for b in &self.blocks {
            let q = b.quantity_at(price);
            total += q;
            *breakdown.entry(b.tech).or_insert(0.0) += q;
        }
        (total, breakdown)
    }

    /// Total offered at `price` without the breakdown.
    pub fn total_at(&self, price: f64) -> f64 {
        self.blocks.iter().map(|b| b.quantity_at(price)).sum()
    }

    /// Total offered just below `price`.
    pub fn total_below(&self, price: f64) -> f64 {
        self.blocks.iter().map(|b| b.quantity_below(price)).sum()
    }

    /// Prices where the curve changes slope or jumps, sorted and deduplicated.
    pub fn kinks(&self) -> Vec<f64> {
        let mut k: Vec<f64> = self.blocks.iter().flat_map(|b| [b.p_lo, b.p_hi]).collect();
        k.sort_by(f64::total_cmp);
        k.dedup();
        k
    }

    /// Lowest price at which at least `q` is offered, or `None` if `q` exceeds
    /// everything on offer.
    pub fn price_at_quantity(&self, q: f64) -> Option<f64> {
        let kinks = self.kinks();
        let first = *kinks.first()?;
        if q <= 0.0 {
            return Some(first);
        }
        let mut prev = first;
        for &k in &kinks {
            if self.total_at(k) >= q {
                let below = self.total_below(k);
                if k > prev && below >= q {
                    let s_prev = self.total_at(prev);
                    let span = below - s_prev;
                    if span > 0.0 {
                        return Some(prev + (q - s_prev) / span * (k - prev));
                    }
                }
                return Some(k);
            }
            prev = k;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(tech: Technology, quantity: f64, band: (f64, f64)) -> TechnologyDescriptor {
        TechnologyDescriptor {
            tech,
            capacity: quantity,
            availability: 1.0,
            fuel_price: None,
            efficiency: None,
            bid: Some(band),
        }
    }

    fn thermal(tech: Technology, quantity: f64, fuel: f64, eta: (f64, f64)) -> TechnologyDescriptor {
        TechnologyDescriptor {
            tech,
            capacity: quantity,
            availability: 1.0,
            fuel_price: Some(fuel),
            efficiency: Some(eta),
            bid: None,
        }
    }

    #[test]
    fn step_block_offers_at_its_price() {
        let c = SupplyCurve::from_descriptors(&[desc(Technology::Nuclear, 10.0, (0.0, 0.0))]);
        assert_eq!(c.total_at(-0.1), 0.0);
        assert_eq!(c.total_at(0.0), 10.0);
        assert_eq!(c.total_below(0.0), 0.0);
    }

    #[test]
    fn ramp_block_is_linear() {
        let c = SupplyCurve::from_descriptors(&[thermal(Technology::Gas, 100.0, 30.0, (0.5, 0.6))]);
        // band [50, 60]
        assert_eq!(c.total_at(50.0), 0.0);
        assert!((c.total_at(55.0) - 50.0).abs() < 1e-9);
        assert_eq!(c.total_at(60.0), 100.0);
    }

    #[test]
    fn merit_order_ties_use_priority() {
        let c = SupplyCurve::from_descriptors(&[
            desc(Technology::Solar, 5.0, (-10.0, -10.0)),
            desc(Technology::Nuclear, 5.0, (-10.0, -10.0)),
            desc(Technology::Wind, 5.0, (-10.0, -10.0)),
        ]);
        let order: Vec<_> = c.blocks().iter().map(|b| b.tech).collect();
        assert_eq!(
            order,
            vec![Technology::Nuclear, Technology::Wind, Technology::Solar]
        );
    }

    #[test]
    fn breakdown_covers_all_technologies() {
        let c = SupplyCurve::from_descriptors(&[desc(Technology::Wind, 5.0, (0.0, 10.0))]);
        let (total, br) = c.quantity_at(5.0);
        assert!((total - 2.5).abs() < 1e-12);
        assert_eq!(br.len(), 5);
        assert_eq!(br[&Technology::Gas], 0.0);
    }

    #[test]
    fn zero_capacity_contributes_nothing() {
        let c = SupplyCurve::from_descriptors(&[
            desc(Technology::Wind, 0.0, (0.0, 10.0)),
            thermal(Technology::Coal, 50.0, 20.0, (0.0, 0.0)),
        ]);
        assert!(c.blocks().is_empty());
        assert_eq!(c.total_at(1e6), 0.0);
        assert_eq!(c.price_at_quantity(1.0), None);
        assert_eq!(c.available()[&Technology::Coal], 50.0);
    }

    #[test]
    fn inverse_finds_lowest_price() {
        let c = SupplyCurve::from_descriptors(&[
            desc(Technology::Nuclear, 10.0, (0.0, 0.0)),
            thermal(Technology::Gas, 100.0, 30.0, (0.5, 0.6)),
        ]);
        // Anything up to the nuclear step clears at 0.
        assert_eq!(c.price_at_quantity(10.0), Some(0.0));
        // Halfway up the gas ramp.
        let p = c.price_at_quantity(60.0).unwrap();
        assert!((p - 55.0).abs() < 1e-9);
        assert_eq!(c.price_at_quantity(110.0), Some(60.0));
        assert_eq!(c.price_at_quantity(111.0), None);
    }
}
