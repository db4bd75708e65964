//! Supply side: technologies, merit-order curves and weather availability.

pub mod curve;
pub mod technology;
pub mod weather;

pub use curve::{Block, Breakdown, SupplyCurve};
pub use technology::{Technology, TechnologyDescriptor};
pub use weather::{RenewableSourcing, SolarSinusoidal, WindAr1};

use chrono::NaiveDateTime;

use crate::config::OutageConfig;
use crate::sim::types::ResolvedValues;

/// Builds hourly supply curves from resolved variable values.
#[derive(Debug, Clone, Default)]
pub struct SupplyCurveBuilder {
    outages: OutageConfig,
}

impl SupplyCurveBuilder {
    pub fn new(outages: OutageConfig) -> Self {
        Self { outages }
    }

    /// Resolves every technology's descriptor for `ts`.
    pub fn descriptors(&self, ts: NaiveDateTime, values: &ResolvedValues) -> Vec<TechnologyDescriptor> {
        Technology::ALL
            .iter()
            .map(|t| TechnologyDescriptor::resolve(*t, ts, values, &self.outages))
            .collect()
    }

    /// Assembles the merit-order curve for `ts`.
    pub fn build(&self, ts: NaiveDateTime, values: &ResolvedValues) -> SupplyCurve {
        SupplyCurve::from_descriptors(&self.descriptors(ts, values))
    }

    /// Total quantity offered at `price` and its per-technology split.
    pub fn quantity_at(
        &self,
        price: f64,
        ts: NaiveDateTime,
        values: &ResolvedValues,
    ) -> (f64, Breakdown) {
        self.build(ts, values).quantity_at(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn builder_reads_fleet_values() {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let values: ResolvedValues = [
            ("cap.nuclear", 100.0),
            ("avail.nuclear", 1.0),
            ("cap.gas", 200.0),
            ("avail.gas", 0.5),
            ("fuel.gas", 30.0),
            ("eta_lb.gas", 0.5),
            ("eta_ub.gas", 0.5),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();

        let builder = SupplyCurveBuilder::new(OutageConfig::default());
        let (total, br) = builder.quantity_at(100.0, ts, &values);
        assert_eq!(total, 200.0);
        assert_eq!(br[&Technology::Nuclear], 100.0);
        assert_eq!(br[&Technology::Gas], 100.0);

        // Below the gas step only nuclear is offered.
        let (total, _) = builder.quantity_at(59.0, ts, &values);
        assert_eq!(total, 100.0);
    }
}
