//! Post-hoc run summary computed from output records.

use std::fmt;

use crate::equilibrium::ClearingStatus;
use crate::supply::{Breakdown, Technology};

use super::types::OutputRecord;

/// Aggregate statistics over a complete simulation run.
///
/// Computed from the record vector after the fact, so the summary always
/// agrees with what was exported.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Number of simulated hours.
    pub hours: usize,
    pub mean_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Mean cleared quantity (MW).
    pub mean_quantity: f64,
    /// Hours clamped at the grid floor.
    pub clamped_low: usize,
    /// Hours clamped at the grid ceiling.
    pub clamped_high: usize,
    /// Share of total dispatched energy per technology, in [0, 1].
    pub energy_share: Breakdown,
}

impl RunSummary {
    pub fn from_records(records: &[OutputRecord]) -> Self {
        if records.is_empty() {
            return Self {
                hours: 0,
                mean_price: 0.0,
                min_price: 0.0,
                max_price: 0.0,
                mean_quantity: 0.0,
                clamped_low: 0,
                clamped_high: 0,
                energy_share: Breakdown::new(),
            };
        }

        let n = records.len() as f64;
        let mut price_sum = 0.0;
        let mut qty_sum = 0.0;
        let mut min_price = f64::INFINITY;
        let mut max_price = f64::NEG_INFINITY;
        let mut clamped_low = 0;
        let mut clamped_high = 0;
        let mut energy = Breakdown::new();

        for r in records {
            price_sum += r.price;
            qty_sum += r.quantity;
            min_price = min_price.min(r.price);
            max_price = max_price.max(r.price);
            match r.status {
                ClearingStatus::ClampedLow => clamped_low += 1,
                ClearingStatus::ClampedHigh => clamped_high += 1,
                ClearingStatus::Cleared => {}
            }
            for (tech, q) in &r.dispatch {
                *energy.entry(*tech).or_insert(0.0) += q;
            }
        }

        let total: f64 = energy.values().sum();
        let energy_share = Technology::ALL
            .iter()
            .map(|t| {
                let e = energy.get(t).copied().unwrap_or(0.0);
                let share = if total > 0.0 { e / total } else { 0.0 };
                (*t, share)
            })
            .collect();

        Self {
            hours: records.len(),
            mean_price: price_sum / n,
            min_price,
            max_price,
            mean_quantity: qty_sum / n,
            clamped_low,
            clamped_high,
            energy_share,
        }
    }

    /// Total clamped hours at either boundary.
    pub fn clamped(&self) -> usize {
        self.clamped_low + self.clamped_high
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Summary ---")?;
        writeln!(f, "Hours simulated:   {}", self.hours)?;
        writeln!(
            f,
            "Price (mean/min/max): {:.2} / {:.2} / {:.2}",
            self.mean_price, self.min_price, self.max_price
        )?;
        writeln!(f, "Mean quantity:     {:.1} MW", self.mean_quantity)?;
        writeln!(
            f,
            "Clamped hours:     {} (low {}, high {})",
            self.clamped(),
            self.clamped_low,
            self.clamped_high
        )?;
        write!(f, "Energy share:     ")?;
        for (tech, share) in &self.energy_share {
            write!(f, " {}={:.1}%", tech, 100.0 * share)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::{RegimeLabels, ResolvedValues};
    use chrono::{NaiveDate, TimeDelta};

    fn make_record(h: i64, price: f64, status: ClearingStatus, gas: f64) -> OutputRecord {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let dispatch: Breakdown = [(Technology::Nuclear, 100.0), (Technology::Gas, gas)]
            .into_iter()
            .collect();
        OutputRecord {
            timestamp: start + TimeDelta::hours(h),
            price,
            quantity: 100.0 + gas,
            status,
            available: dispatch.clone(),
            dispatch,
            values: ResolvedValues::new(),
            regimes: RegimeLabels::new(),
        }
    }

    #[test]
    fn price_statistics() {
        let records = vec![
            make_record(0, 10.0, ClearingStatus::Cleared, 0.0),
            make_record(1, 30.0, ClearingStatus::Cleared, 0.0),
            make_record(2, -5.0, ClearingStatus::Cleared, 0.0),
        ];
        let s = RunSummary::from_records(&records);
        assert_eq!(s.hours, 3);
        assert!((s.mean_price - 35.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.min_price, -5.0);
        assert_eq!(s.max_price, 30.0);
        assert_eq!(s.mean_quantity, 100.0);
    }

    #[test]
    fn clamp_counting() {
        let records = vec![
            make_record(0, -100.0, ClearingStatus::ClampedLow, 0.0),
            make_record(1, 200.0, ClearingStatus::ClampedHigh, 0.0),
            make_record(2, 200.0, ClearingStatus::ClampedHigh, 0.0),
            make_record(3, 40.0, ClearingStatus::Cleared, 0.0),
        ];
        let s = RunSummary::from_records(&records);
        assert_eq!(s.clamped_low, 1);
        assert_eq!(s.clamped_high, 2);
        assert_eq!(s.clamped(), 3);
    }

    #[test]
    fn energy_shares_sum_to_one() {
        let records = vec![
            make_record(0, 20.0, ClearingStatus::Cleared, 100.0),
            make_record(1, 20.0, ClearingStatus::Cleared, 300.0),
        ];
        let s = RunSummary::from_records(&records);
        // nuclear 200, gas 400
        assert!((s.energy_share[&Technology::Gas] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.energy_share[&Technology::Coal], 0.0);
        let total: f64 = s.energy_share.values().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_records() {
        let s = RunSummary::from_records(&[]);
        assert_eq!(s.hours, 0);
        assert_eq!(s.clamped(), 0);
        assert!(s.energy_share.is_empty());
    }

    #[test]
    fn display_lists_every_technology() {
        let s = RunSummary::from_records(&[make_record(0, 20.0, ClearingStatus::Cleared, 0.0)]);
        let text = s.to_string();
        for tech in Technology::ALL {
            assert!(text.contains(&format!("{tech}=")));
        }
    }
}
