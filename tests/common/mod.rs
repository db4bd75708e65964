//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};

use merit_sim::config::{DistConfig, RegimeConfig, ScenarioConfig, VariableConfig};

/// Midnight-based timestamp helper.
pub fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|d| d.and_hms_opt(h, 0, 0))
        .unwrap()
}

/// Single-regime variable with the given distribution.
pub fn single(regime: &str, dist: DistConfig) -> VariableConfig {
    VariableConfig {
        regimes: vec![RegimeConfig {
            name: regime.to_string(),
            dist,
            breakpoints: Vec::new(),
        }],
    }
}

/// Sets `name` to a constant single-regime variable.
pub fn set_const(cfg: &mut ScenarioConfig, name: &str, v: f64) {
    cfg.variables
        .insert(name.to_string(), single("fixed", DistConfig::constant(v)));
}

/// Baseline preset cut to `days` days.
pub fn short_baseline(days: usize, seed: u64) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.days = days;
    cfg.simulation.seed = seed;
    cfg
}

/// One day of a toy market: grid 0..=100 step 10, flat demand
/// `P = 50 - 10 Q`, and a single nuclear block of 10 MW bid at 0.
///
/// Every input is constant, so every hour clears identically.
pub fn toy_market() -> ScenarioConfig {
    let mut cfg = ScenarioConfig::default();
    cfg.simulation.start = at(2025, 1, 1, 0);
    cfg.simulation.days = 1;
    cfg.market.price_grid = (0..=10).map(|i| 10.0 * f64::from(i)).collect();
    cfg.demand.base_intercept = 50.0;
    cfg.demand.slope = -10.0;
    cfg.demand.daily_seasonality = false;
    cfg.demand.annual_seasonality = false;
    cfg.outages.enabled = false;

    set_const(&mut cfg, "fuel.coal", 25.0);
    set_const(&mut cfg, "fuel.gas", 30.0);
    set_const(&mut cfg, "cap.nuclear", 10.0);
    set_const(&mut cfg, "avail.nuclear", 1.0);
    set_const(&mut cfg, "bid.nuclear.min", 0.0);
    set_const(&mut cfg, "bid.nuclear.max", 0.0);
    cfg
}

/// Gas-only market with flat elastic demand `P = 150 - 0.1 Q`, 1000 MW of
/// gas at efficiency 0.45..0.55 and the given constant fuel price.
pub fn gas_only(fuel_gas: f64) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::default();
    cfg.simulation.days = 1;
    cfg.demand.base_intercept = 150.0;
    cfg.demand.slope = -0.1;
    cfg.demand.daily_seasonality = false;
    cfg.demand.annual_seasonality = false;
    cfg.outages.enabled = false;

    set_const(&mut cfg, "fuel.coal", 25.0);
    set_const(&mut cfg, "fuel.gas", fuel_gas);
    set_const(&mut cfg, "cap.gas", 1000.0);
    set_const(&mut cfg, "avail.gas", 1.0);
    set_const(&mut cfg, "eta_lb.gas", 0.45);
    set_const(&mut cfg, "eta_ub.gas", 0.55);
    cfg
}
