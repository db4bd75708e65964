//! Demand curve builder with daily, weekly and annual seasonality.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::Deserialize;

use crate::config::DemandConfig;

/// Day of year of the winter demand peak (mid-January).
const WINTER_PEAK_DOY: f64 = 15.0;

/// How the daily and annual multipliers combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalComposition {
    /// `daily × annual`.
    #[default]
    Multiplicative,
    /// `1 + (daily − 1) + (annual − 1)`.
    Additive,
}

/// Demand for one hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DemandCurve {
    /// `P = intercept + slope × Q`, with `slope < 0`.
    Elastic { intercept: f64, slope: f64 },
    /// Vertical demand at `target`.
    Inelastic { target: f64 },
}

impl DemandCurve {
    /// Quantity demanded at `price`, floored at 0.
    pub fn quantity_at(&self, price: f64) -> f64 {
        match *self {
            DemandCurve::Elastic { intercept, slope } => ((price - intercept) / slope).max(0.0),
            DemandCurve::Inelastic { target } => target,
        }
    }

    /// Price at which demand reaches zero (elastic only).
    pub fn choke_price(&self) -> Option<f64> {
        match *self {
            DemandCurve::Elastic { intercept, .. } => Some(intercept),
            DemandCurve::Inelastic { .. } => None,
        }
    }
}

/// Seasonally modulated demand model.
#[derive(Debug, Clone)]
pub struct DemandModel {
    config: DemandConfig,
}

impl DemandModel {
    pub fn new(config: DemandConfig) -> Self {
        Self { config }
    }

    pub fn is_inelastic(&self) -> bool {
        self.config.inelastic
    }

    /// Hour-of-day cosine peaking at `day_peak_hour`, scaled down on weekends.
    pub fn daily_multiplier(&self, ts: NaiveDateTime) -> f64 {
        let c = &self.config;
        if !c.daily_seasonality {
            return 1.0;
        }
        let h = f64::from(ts.hour());
        let peak = f64::from(c.day_peak_hour);
        let bump = 1.0 + c.day_amp * ((h - peak) / 12.0 * std::f64::consts::PI).cos();
        let weekend = match ts.weekday() {
            Weekday::Sat | Weekday::Sun => 1.0 - c.weekend_drop,
            _ => 1.0,
        };
        (bump * weekend).max(0.0)
    }

    /// Cosine over the year: `1 + winter_amp` in mid-January, `1 + summer_amp`
    /// half a year later.
    pub fn annual_multiplier(&self, ts: NaiveDateTime) -> f64 {
        let c = &self.config;
        if !c.annual_seasonality {
            return 1.0;
        }
        let doy = f64::from(ts.ordinal());
        let days_in_year = if ts.date().leap_year() { 366.0 } else { 365.0 };
        let wave = (2.0 * std::f64::consts::PI * (doy - WINTER_PEAK_DOY) / days_in_year).cos();
        let half_range = (c.winter_amp - c.summer_amp) / 2.0;
        let midpoint = (c.winter_amp + c.summer_amp) / 2.0;
        (1.0 + midpoint + half_range * wave).max(0.0)
    }

    /// Combined seasonal multiplier for `ts`.
    pub fn seasonal_multiplier(&self, ts: NaiveDateTime) -> f64 {
        let daily = self.daily_multiplier(ts);
        let annual = self.annual_multiplier(ts);
        match self.config.composition {
            SeasonalComposition::Multiplicative => daily * annual,
            SeasonalComposition::Additive => (daily + annual - 1.0).max(0.0),
        }
    }

    /// Demand curve for the hour starting at `ts`.
    ///
    /// Seasonality shifts the elastic intercept; the slope never changes.
    pub fn curve_at(&self, ts: NaiveDateTime) -> DemandCurve {
        let m = self.seasonal_multiplier(ts);
        if self.config.inelastic {
            DemandCurve::Inelastic {
                target: (self.config.base_intercept * m).max(0.0),
            }
        } else {
            DemandCurve::Elastic {
                intercept: self.config.base_intercept * m,
                slope: self.config.slope,
            }
        }
    }

    /// Price on the elastic curve at `quantity`; `None` for inelastic demand.
    pub fn price_at(&self, quantity: f64, ts: NaiveDateTime) -> Option<f64> {
        match self.curve_at(ts) {
            DemandCurve::Elastic { intercept, slope } => Some(intercept + slope * quantity),
            DemandCurve::Inelastic { .. } => None,
        }
    }

    /// Fixed target quantity; `None` for elastic demand.
    pub fn target_quantity(&self, ts: NaiveDateTime) -> Option<f64> {
        match self.curve_at(ts) {
            DemandCurve::Inelastic { target } => Some(target),
            DemandCurve::Elastic { .. } => None,
        }
    }
}
