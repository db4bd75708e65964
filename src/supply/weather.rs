//! Weather-driven availability for wind and solar.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, StandardNormal};

use crate::config::{RenewableMode, RenewablesConfig, SolarConfig, WindConfig};
use crate::error::ConfigError;
use crate::sim::types::ResolvedValues;

/// Seed offset for the wind model, so weather draws stay independent of the scheduler.
pub const WIND_SEED_OFFSET: u64 = 57;

/// Standard deviation of the first-hour draw each day.
const DAILY_REINIT_STD: f64 = 0.10;

/// Wind capacity factor with an AR(1) process that restarts every day.
///
/// Within a day the factor evolves as:
/// ```text
/// cf(t) = base + rho * (cf(t-1) - base) + sigma * epsilon(t)
/// ```
/// The first hour of each calendar day is drawn from `N(base, 0.10)`.
/// Values are clipped to \[0, 1\].
#[derive(Debug, Clone)]
pub struct WindAr1 {
    /// Long-run mean capacity factor.
    pub base: f64,
    /// AR(1) persistence.
    pub rho: f64,
    /// Innovation standard deviation.
    pub sigma: f64,
    /// Day and value of the previous draw.
    last: Option<(NaiveDate, f64)>,
    rng: StdRng,
}

impl WindAr1 {
    /// Creates a wind model with its own seeded RNG.
    pub fn new(config: &WindConfig, seed: u64) -> Self {
        Self {
            base: config.base_capacity_factor.clamp(0.0, 1.0),
            rho: config.persistence.clamp(0.0, 1.0),
            sigma: config.volatility.max(0.0),
            last: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Advances one hour and returns the capacity factor at `ts`.
    pub fn availability_at(&mut self, ts: NaiveDateTime) -> f64 {
        let day = ts.date();
        let cf = match self.last {
            Some((prev_day, prev)) if prev_day == day => {
                let eps: f64 = StandardNormal.sample(&mut self.rng);
                self.base + self.rho * (prev - self.base) + self.sigma * eps
            }
            _ => {
                let eps: f64 = StandardNormal.sample(&mut self.rng);
                self.base + DAILY_REINIT_STD * eps
            }
        }
        .clamp(0.0, 1.0);
        self.last = Some((day, cf));
        cf
    }
}

/// Deterministic half-sine solar capacity factor.
#[derive(Debug, Clone)]
pub struct SolarSinusoidal {
    /// First daylight hour (inclusive).
    pub sunrise_hour: u32,
    /// Last daylight hour (exclusive).
    pub sunset_hour: u32,
    /// Capacity factor at solar noon.
    pub peak: f64,
}

impl SolarSinusoidal {
    /// # Errors
    ///
    /// Returns a `ConfigError` if `sunrise_hour >= sunset_hour` or
    /// `sunset_hour > 24`.
    pub fn new(config: &SolarConfig) -> Result<Self, ConfigError> {
        if config.sunrise_hour >= config.sunset_hour {
            return Err(ConfigError::new(
                "renewables.solar.sunrise_hour",
                "must be < renewables.solar.sunset_hour",
            ));
        }
        if config.sunset_hour > 24 {
            return Err(ConfigError::new("renewables.solar.sunset_hour", "must be <= 24"));
        }
        Ok(Self {
            sunrise_hour: config.sunrise_hour,
            sunset_hour: config.sunset_hour,
            peak: config.peak_capacity_factor.max(0.0),
        })
    }

    /// Daylight fraction in \[0, 1\] for `hour`.
    fn daylight_frac(&self, hour: u32) -> f64 {
        if hour < self.sunrise_hour || hour >= self.sunset_hour {
            return 0.0;
        }
        let x = f64::from(hour - self.sunrise_hour)
            / f64::from(self.sunset_hour - self.sunrise_hour);
        (std::f64::consts::PI * x).sin()
    }

    pub fn availability_at(&self, ts: NaiveDateTime) -> f64 {
        self.peak * self.daylight_frac(ts.hour())
    }
}

/// Where wind and solar availability comes from, fixed for the whole run.
#[derive(Debug, Clone)]
pub enum RenewableSourcing {
    /// Weather models replace the scheduled `avail.wind` / `avail.solar`.
    Weather {
        wind: WindAr1,
        solar: SolarSinusoidal,
    },
    /// Scheduled values are used as they are.
    Direct,
}

impl RenewableSourcing {
    /// Resolves the configured mode. Weather models are seeded from `seed`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if weather mode is selected with an invalid
    /// solar day.
    pub fn from_config(config: &RenewablesConfig, seed: u64) -> Result<Self, ConfigError> {
        Ok(match config.mode {
            RenewableMode::WeatherSimulation => Self::Weather {
                wind: WindAr1::new(&config.wind, seed.wrapping_add(WIND_SEED_OFFSET)),
                solar: SolarSinusoidal::new(&config.solar)?,
            },
            RenewableMode::Direct => Self::Direct,
        })
    }

    /// Writes weather-driven availability into `values` for the hour `ts`.
    pub fn apply(&mut self, ts: NaiveDateTime, values: &mut ResolvedValues) {
        if let Self::Weather { wind, solar } = self {
            values.insert("avail.wind".to_string(), wind.availability_at(ts));
            values.insert("avail.solar".to_string(), solar.availability_at(ts));
        }
    }
}
