//! TOML-based scenario configuration and preset definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::demand::SeasonalComposition;
use crate::dists::DistSpec;
use crate::equilibrium::ClampPolicy;
pub use crate::error::ConfigError;

/// Variables every scenario must define.
pub const REQUIRED_VARIABLES: &[&str] = &["fuel.coal", "fuel.gas"];

/// Variables required when renewable availability is sampled directly.
pub const DIRECT_MODE_VARIABLES: &[&str] = &["avail.wind", "avail.solar"];

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::baseline`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation window and seed.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Price grid and clamp policy.
    #[serde(default)]
    pub market: MarketConfig,
    /// Demand curve parameters.
    #[serde(default)]
    pub demand: DemandConfig,
    /// Regime timing mode.
    #[serde(default)]
    pub planner: PlannerConfig,
    /// Per-variable regime definitions, keyed by variable name (e.g. `"fuel.gas"`).
    #[serde(default)]
    pub variables: BTreeMap<String, VariableConfig>,
    /// Empirical series name to CSV path.
    #[serde(default)]
    pub empirical_series: BTreeMap<String, PathBuf>,
    /// Seasonal planned outages for dispatchable plants.
    #[serde(default)]
    pub outages: OutageConfig,
    /// Renewable availability sourcing.
    #[serde(default)]
    pub renewables: RenewablesConfig,
}

/// Simulation window and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// First simulated hour, e.g. `"2025-01-01T00:00:00"`.
    pub start: NaiveDateTime,
    /// Number of days to simulate (must be > 0).
    pub days: usize,
    /// Master random seed.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start: jan_first(2025),
            days: 30,
            seed: 42,
        }
    }
}

/// Market clearing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarketConfig {
    /// Discrete price grid bounding the solver (currency/MWh).
    pub price_grid: Vec<f64>,
    /// What to do when no root lies inside the grid.
    pub clamp_policy: ClampPolicy,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            price_grid: (0..=100).map(|i| -100.0 + 3.0 * f64::from(i)).collect(),
            clamp_policy: ClampPolicy::Lenient,
        }
    }
}

/// Demand curve parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandConfig {
    /// Vertical demand at a seasonal target quantity instead of a sloped curve.
    pub inelastic: bool,
    /// Price intercept (elastic) or base quantity (inelastic).
    pub base_intercept: f64,
    /// dP/dQ of the elastic curve (must be negative).
    pub slope: f64,
    /// Enable the hour-of-day cosine and weekend drop.
    pub daily_seasonality: bool,
    /// Hour of the daily peak (0-23).
    pub day_peak_hour: u32,
    /// Daily cosine amplitude as a fraction.
    pub day_amp: f64,
    /// Fractional reduction on Saturdays and Sundays.
    pub weekend_drop: f64,
    /// Enable the winter/summer cosine.
    pub annual_seasonality: bool,
    /// Fractional shift at the winter peak (mid-January).
    pub winter_amp: f64,
    /// Fractional shift at the summer trough.
    pub summer_amp: f64,
    /// How daily and annual multipliers combine.
    pub composition: SeasonalComposition,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            inelastic: false,
            base_intercept: 200.0,
            slope: -0.006,
            daily_seasonality: true,
            day_peak_hour: 14,
            day_amp: 0.25,
            weekend_drop: 0.10,
            annual_seasonality: true,
            winter_amp: 0.15,
            summer_amp: -0.10,
            composition: SeasonalComposition::Multiplicative,
        }
    }
}

/// Regime timing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerMode {
    /// Every variable brings its own regimes and breakpoints.
    #[default]
    LocalOnly,
    /// One shared segmentation for all variables.
    Global,
    /// Shared segmentation unless a variable declares its own breakpoints.
    Hybrid,
}

/// Regime planner configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// Timing mode.
    pub mode: PlannerMode,
    /// Shared segmentation, required for `global` and `hybrid`.
    pub global: Option<GlobalSettings>,
}

/// Shared segmentation used by the `global` and `hybrid` modes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalSettings {
    /// Number of segments for equal or stochastic splits.
    pub n_regimes: usize,
    /// Explicit breakpoints; take precedence over stochastic ones.
    pub breakpoints: Vec<BreakpointConfig>,
    /// Randomly placed breakpoints.
    pub stochastic: Option<StochasticBreakpoints>,
    /// Distribution used for variables that declare no regimes.
    pub templates: BTreeMap<String, DistConfig>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            n_regimes: 3,
            breakpoints: Vec::new(),
            stochastic: None,
            templates: BTreeMap::new(),
        }
    }
}

/// Stochastic breakpoint placement.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StochasticBreakpoints {
    /// Whether random placement is used at all.
    pub enabled: bool,
    /// Shortest segment in days.
    pub min_segment_days: usize,
    /// Longest segment in days.
    pub max_segment_days: usize,
    /// Transition window drawn for each breakpoint.
    pub transition_hours: TransitionHours,
}

impl Default for StochasticBreakpoints {
    fn default() -> Self {
        Self {
            enabled: false,
            min_segment_days: 30,
            max_segment_days: 180,
            transition_hours: TransitionHours::default(),
        }
    }
}

/// Transition window length for stochastic breakpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionHours {
    /// Same window for every breakpoint.
    Fixed { value: u32 },
    /// Window drawn uniformly from `[min, max]`.
    Range { min: u32, max: u32 },
}

impl Default for TransitionHours {
    fn default() -> Self {
        Self::Fixed { value: 168 }
    }
}

/// A dated regime handover.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakpointConfig {
    /// Activation date of the incoming regime (midnight).
    pub date: NaiveDate,
    /// Length of the blend window ending at `date`.
    #[serde(default = "default_transition_hours")]
    pub transition_hours: u32,
}

fn default_transition_hours() -> u32 {
    24
}

/// Regimes for one variable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariableConfig {
    /// Regimes in activation order.
    pub regimes: Vec<RegimeConfig>,
}

/// One named regime.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegimeConfig {
    /// Label written to the output.
    pub name: String,
    /// Value-generating distribution.
    pub dist: DistConfig,
    /// Local breakpoints (used by `local_only` and `hybrid`).
    #[serde(default)]
    pub breakpoints: Vec<BreakpointConfig>,
}

/// Untyped distribution table as written in TOML.
///
/// Converted into a [`DistSpec`] during schedule construction, where unknown
/// kinds and missing parameters are reported with the variable path.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistConfig {
    pub kind: String,
    pub v: Option<f64>,
    pub mu: Option<f64>,
    pub sigma: Option<f64>,
    pub phi: Option<f64>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub start: Option<f64>,
    pub slope: Option<f64>,
    pub drift: Option<f64>,
    pub name: Option<String>,
    pub transform: Option<String>,
    pub bounds: Option<BoundsConfig>,
}

/// Optional clamp range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoundsConfig {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl DistConfig {
    fn of_kind(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::default()
        }
    }

    /// `const` distribution.
    pub fn constant(v: f64) -> Self {
        Self {
            v: Some(v),
            ..Self::of_kind("const")
        }
    }

    /// `normal` distribution.
    pub fn normal(mu: f64, sigma: f64) -> Self {
        Self {
            mu: Some(mu),
            sigma: Some(sigma),
            ..Self::of_kind("normal")
        }
    }

    /// `uniform` distribution.
    pub fn uniform(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..Self::of_kind("uniform")
        }
    }

    /// `beta` distribution rescaled to `[low, high]`.
    pub fn beta(alpha: f64, beta: f64, low: f64, high: f64) -> Self {
        Self {
            alpha: Some(alpha),
            beta: Some(beta),
            low: Some(low),
            high: Some(high),
            ..Self::of_kind("beta")
        }
    }

    /// `ar1` process.
    pub fn ar1(mu: f64, sigma: f64, phi: f64) -> Self {
        Self {
            mu: Some(mu),
            sigma: Some(sigma),
            phi: Some(phi),
            ..Self::of_kind("ar1")
        }
    }

    /// `linear` trend.
    pub fn linear(start: f64, slope: f64) -> Self {
        Self {
            start: Some(start),
            slope: Some(slope),
            ..Self::of_kind("linear")
        }
    }

    /// `empirical` lookup.
    pub fn empirical(name: &str, transform: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            transform: Some(transform.to_string()),
            ..Self::of_kind("empirical")
        }
    }

    /// Adds a clamp range.
    pub fn with_bounds(mut self, low: f64, high: f64) -> Self {
        self.bounds = Some(BoundsConfig {
            low: Some(low),
            high: Some(high),
        });
        self
    }
}

/// Seasonal planned outages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutageConfig {
    /// Apply outages at all.
    pub enabled: bool,
    /// Calendar months (1-12) with planned maintenance.
    pub months: Vec<u32>,
    /// Fractional availability reduction for nuclear.
    pub nuclear_reduction: f64,
    /// Fractional availability reduction for coal.
    pub coal_reduction: f64,
    /// Fractional availability reduction for gas.
    pub gas_reduction: f64,
}

impl Default for OutageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            months: vec![5, 6, 7, 8, 9],
            nuclear_reduction: 0.10,
            coal_reduction: 0.10,
            gas_reduction: 0.10,
        }
    }
}

/// Where wind and solar availability comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewableMode {
    /// Dedicated weather models override `avail.wind` and `avail.solar`.
    #[default]
    WeatherSimulation,
    /// Scheduler-sampled `avail.wind` and `avail.solar` are used unmodified.
    Direct,
}

/// Renewable availability configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenewablesConfig {
    /// Sourcing mode.
    pub mode: RenewableMode,
    /// AR(1) wind model parameters.
    pub wind: WindConfig,
    /// Sinusoidal solar model parameters.
    pub solar: SolarConfig,
}

/// AR(1) wind capacity-factor parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindConfig {
    /// Long-run mean capacity factor.
    pub base_capacity_factor: f64,
    /// AR(1) persistence (0-1).
    pub persistence: f64,
    /// Innovation standard deviation.
    pub volatility: f64,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            base_capacity_factor: 0.45,
            persistence: 0.85,
            volatility: 0.15,
        }
    }
}

/// Sinusoidal solar capacity-factor parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    /// First daylight hour (inclusive).
    pub sunrise_hour: u32,
    /// Last daylight hour (exclusive).
    pub sunset_hour: u32,
    /// Capacity factor at solar noon.
    pub peak_capacity_factor: f64,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            sunrise_hour: 6,
            sunset_hour: 20,
            peak_capacity_factor: 0.35,
        }
    }
}

fn fail(errors: &mut Vec<ConfigError>, field: &str, message: &str) {
    errors.push(ConfigError::new(field, message));
}

fn jan_first(year: i32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn single(name: &str, dist: DistConfig) -> VariableConfig {
    VariableConfig {
        regimes: vec![RegimeConfig {
            name: name.to_string(),
            dist,
            breakpoints: Vec::new(),
        }],
    }
}

fn regime(name: &str, dist: DistConfig, handover: Option<(NaiveDate, u32)>) -> RegimeConfig {
    RegimeConfig {
        name: name.to_string(),
        dist,
        breakpoints: handover
            .map(|(date, transition_hours)| {
                vec![BreakpointConfig {
                    date,
                    transition_hours,
                }]
            })
            .unwrap_or_default(),
    }
}

/// Five-technology fleet shared by all presets.
fn fleet_variables() -> BTreeMap<String, VariableConfig> {
    let mut v = BTreeMap::new();
    let mut put = |name: &str, var: VariableConfig| {
        v.insert(name.to_string(), var);
    };

    put(
        "fuel.gas",
        single("stable", DistConfig::ar1(30.0, 1.5, 0.95).with_bounds(5.0, 200.0)),
    );
    put(
        "fuel.coal",
        single("stable", DistConfig::ar1(25.0, 1.0, 0.95).with_bounds(5.0, 150.0)),
    );

    put("cap.nuclear", single("fleet", DistConfig::constant(5000.0)));
    put("cap.coal", single("fleet", DistConfig::constant(6000.0)));
    put("cap.gas", single("fleet", DistConfig::constant(8000.0)));
    put("cap.wind", single("fleet", DistConfig::constant(4000.0)));
    put("cap.solar", single("fleet", DistConfig::constant(3000.0)));

    put("avail.nuclear", single("baseline", DistConfig::beta(30.0, 2.0, 0.90, 0.98)));
    put("avail.coal", single("baseline", DistConfig::beta(20.0, 3.0, 0.80, 0.95)));
    put("avail.gas", single("baseline", DistConfig::beta(20.0, 2.0, 0.85, 0.97)));

    put("eta_lb.coal", single("fleet", DistConfig::constant(0.33)));
    put("eta_ub.coal", single("fleet", DistConfig::constant(0.38)));
    put("eta_lb.gas", single("fleet", DistConfig::constant(0.45)));
    put("eta_ub.gas", single("fleet", DistConfig::constant(0.55)));

    put("bid.nuclear.min", single("fleet", DistConfig::constant(-200.0)));
    put("bid.nuclear.max", single("fleet", DistConfig::constant(-50.0)));
    put("bid.wind.min", single("fleet", DistConfig::constant(-200.0)));
    put("bid.wind.max", single("fleet", DistConfig::constant(-50.0)));
    put("bid.solar.min", single("fleet", DistConfig::constant(-200.0)));
    put("bid.solar.max", single("fleet", DistConfig::constant(-50.0)));
    v
}

impl ScenarioConfig {
    /// Returns the baseline scenario: one month, stable fuels, weather-driven renewables.
    pub fn baseline() -> Self {
        Self {
            variables: fleet_variables(),
            ..Self::default()
        }
    }

    /// Returns the gas-crisis preset: gas spikes May to August, coal follows.
    pub fn gas_crisis() -> Self {
        let mut cfg = Self::baseline();
        cfg.simulation.days = 365;

        let may = Some((date(2025, 5, 1), 168));
        let sep = Some((date(2025, 9, 1), 168));
        cfg.variables.insert(
            "fuel.gas".to_string(),
            VariableConfig {
                regimes: vec![
                    regime("normal", DistConfig::ar1(30.0, 1.5, 0.95).with_bounds(5.0, 200.0), may),
                    regime("crisis", DistConfig::ar1(85.0, 4.0, 0.97).with_bounds(5.0, 200.0), sep),
                    regime("recovery", DistConfig::ar1(35.0, 2.0, 0.95).with_bounds(5.0, 200.0), None),
                ],
            },
        );
        cfg.variables.insert(
            "fuel.coal".to_string(),
            VariableConfig {
                regimes: vec![
                    regime("normal", DistConfig::ar1(25.0, 1.0, 0.95).with_bounds(5.0, 150.0), may),
                    regime("elevated", DistConfig::ar1(40.0, 2.0, 0.95).with_bounds(5.0, 150.0), sep),
                    regime("recovery", DistConfig::ar1(28.0, 1.0, 0.95).with_bounds(5.0, 150.0), None),
                ],
            },
        );
        cfg
    }

    /// Returns the coal-phaseout preset: coal capacity retires linearly from April.
    pub fn coal_phaseout() -> Self {
        let mut cfg = Self::baseline();
        cfg.simulation.days = 365;

        cfg.variables.insert(
            "cap.coal".to_string(),
            VariableConfig {
                regimes: vec![
                    regime(
                        "full",
                        DistConfig::constant(6000.0),
                        Some((date(2025, 4, 1), 720)),
                    ),
                    regime(
                        "phaseout",
                        DistConfig::linear(6000.0, -1.0).with_bounds(0.0, 6000.0),
                        None,
                    ),
                ],
            },
        );
        cfg.variables.insert(
            "cap.gas".to_string(),
            VariableConfig {
                regimes: vec![
                    regime("fleet", DistConfig::constant(8000.0), Some((date(2025, 4, 1), 720))),
                    regime(
                        "expansion",
                        DistConfig::linear(8000.0, 0.5).with_bounds(0.0, 12000.0),
                        None,
                    ),
                ],
            },
        );
        cfg
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "gas_crisis", "coal_phaseout"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "gas_crisis" => Ok(Self::gas_crisis()),
            "coal_phaseout" => Ok(Self::coal_phaseout()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Total simulated hours.
    pub fn hours(&self) -> usize {
        self.simulation.days * 24
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.simulation.days == 0 {
            fail(&mut errors, "simulation.days", "must be > 0");
        }

        let grid = &self.market.price_grid;
        if grid.is_empty() {
            fail(&mut errors, "market.price_grid", "must not be empty");
        } else if grid.iter().any(|p| !p.is_finite()) {
            fail(&mut errors, "market.price_grid", "must contain only finite prices");
        }

        let d = &self.demand;
        if !d.inelastic && !(d.slope < 0.0) {
            fail(&mut errors, "demand.slope", "must be < 0 for elastic demand");
        }
        if !d.base_intercept.is_finite() {
            fail(&mut errors, "demand.base_intercept", "must be finite");
        }
        if d.day_peak_hour > 23 {
            fail(&mut errors, "demand.day_peak_hour", "must be in [0, 23]");
        }
        if !(0.0..=1.0).contains(&d.weekend_drop) {
            fail(&mut errors, "demand.weekend_drop", "must be in [0.0, 1.0]");
        }

        let o = &self.outages;
        if o.months.iter().any(|m| !(1..=12).contains(m)) {
            fail(&mut errors, "outages.months", "months must be in [1, 12]");
        }
        for (field, r) in [
            ("outages.nuclear_reduction", o.nuclear_reduction),
            ("outages.coal_reduction", o.coal_reduction),
            ("outages.gas_reduction", o.gas_reduction),
        ] {
            if !(0.0..=1.0).contains(&r) {
                fail(&mut errors, field, "must be in [0.0, 1.0]");
            }
        }

        let w = &self.renewables.wind;
        if !(0.0..=1.0).contains(&w.base_capacity_factor) {
            fail(&mut errors, "renewables.wind.base_capacity_factor", "must be in [0.0, 1.0]");
        }
        if !(0.0..=1.0).contains(&w.persistence) {
            fail(&mut errors, "renewables.wind.persistence", "must be in [0.0, 1.0]");
        }
        if w.volatility < 0.0 {
            fail(&mut errors, "renewables.wind.volatility", "must be >= 0");
        }
        let s = &self.renewables.solar;
        if s.sunrise_hour >= s.sunset_hour {
            fail(&mut errors, "renewables.solar.sunrise_hour", "must be < renewables.solar.sunset_hour");
        }
        if s.sunset_hour > 24 {
            fail(&mut errors, "renewables.solar.sunset_hour", "must be <= 24");
        }

        for name in REQUIRED_VARIABLES {
            if !self.variables.contains_key(*name) {
                fail(&mut errors, &format!("variables.{name}"), "required variable is missing");
            }
        }
        if self.renewables.mode == RenewableMode::Direct {
            for name in DIRECT_MODE_VARIABLES {
                if !self.variables.contains_key(*name) {
                    fail(
                        &mut errors,
                        &format!("variables.{name}"),
                        "required when renewables.mode = \"direct\"",
                    );
                }
            }
        }

        match (self.planner.mode, &self.planner.global) {
            (PlannerMode::LocalOnly, _) => {}
            (_, None) => fail(&mut errors, "planner.global", "required for global and hybrid modes"),
            (_, Some(g)) => {
                if g.n_regimes == 0 {
                    fail(&mut errors, "planner.global.n_regimes", "must be > 0");
                }
                if let Some(st) = &g.stochastic {
                    if st.min_segment_days > st.max_segment_days {
                        fail(
                            &mut errors,
                            "planner.global.stochastic.min_segment_days",
                            "must be <= max_segment_days",
                        );
                    }
                    let n = g.n_regimes;
                    let days = self.simulation.days;
                    if st.enabled && n > 0 && n.saturating_mul(st.min_segment_days) > days {
                        fail(
                            &mut errors,
                            "planner.global.stochastic.min_segment_days",
                            &format!("n_regimes * min_segment_days must be <= {days} simulated days"),
                        );
                    }
                    if st.enabled && n > 0 && n.saturating_mul(st.max_segment_days) < days {
                        fail(
                            &mut errors,
                            "planner.global.stochastic.max_segment_days",
                            &format!("n_regimes * max_segment_days must be >= {days} simulated days"),
                        );
                    }
                    if let TransitionHours::Range { min, max } = st.transition_hours {
                        if min > max {
                            fail(&mut errors, "planner.global.stochastic.transition_hours", "min must be <= max");
                        }
                    }
                }
                for (name, dist) in &g.templates {
                    let field = format!("planner.global.templates.{name}");
                    if let Err(e) = DistSpec::from_config(dist, &field) {
                        errors.push(e);
                    }
                }
            }
        }

        for (name, var) in &self.variables {
            if var.regimes.is_empty() && self.planner.mode == PlannerMode::LocalOnly {
                errors.push(ConfigError::new(
                    format!("variables.{name}.regimes"),
                    "must not be empty in local_only mode",
                ));
            }
            for (i, r) in var.regimes.iter().enumerate() {
                let field = format!("variables.{name}.regimes[{i}].dist");
                if let Err(e) = DistSpec::from_config(&r.dist, &field) {
                    errors.push(e);
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn gas_crisis_has_three_gas_regimes() {
        let cfg = ScenarioConfig::gas_crisis();
        let gas = &cfg.variables["fuel.gas"];
        assert_eq!(gas.regimes.len(), 3);
        assert_eq!(gas.regimes[1].name, "crisis");
        assert_eq!(gas.regimes[0].breakpoints[0].transition_hours, 168);
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
start = "2024-03-01T00:00:00"
days = 2
seed = 7

[market]
price_grid = [0.0, 50.0, 100.0]
clamp_policy = "strict"

[demand]
inelastic = true
base_intercept = 900.0
composition = "additive"

[planner]
mode = "hybrid"

[planner.global]
n_regimes = 2
breakpoints = [{ date = "2024-03-02", transition_hours = 12 }]

[planner.global.templates."cap.gas"]
kind = "const"
v = 100.0

[variables."fuel.gas"]
regimes = [
  { name = "calm", dist = { kind = "ar1", mu = 30.0, sigma = 1.0, phi = 0.9 } },
  { name = "tight", dist = { kind = "normal", mu = 60.0, sigma = 5.0, bounds = { low = 0.0 } } },
]

[variables."fuel.coal"]
regimes = [{ name = "flat", dist = { kind = "const", v = 20.0 } }]

[variables."cap.gas"]

[outages]
enabled = false

[renewables]
mode = "weather_simulation"

[renewables.wind]
persistence = 0.7
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.unwrap();
        assert_eq!(cfg.simulation.days, 2);
        assert_eq!(cfg.market.clamp_policy, ClampPolicy::Strict);
        assert_eq!(cfg.demand.composition, SeasonalComposition::Additive);
        assert_eq!(cfg.planner.mode, PlannerMode::Hybrid);
        assert_eq!(cfg.variables["fuel.gas"].regimes.len(), 2);
        assert!(cfg.variables["cap.gas"].regimes.is_empty());
        assert_eq!(cfg.renewables.wind.persistence, 0.7);
        assert_eq!(cfg.renewables.wind.volatility, 0.15);
        assert!(cfg.validate().is_empty(), "{:?}", cfg.validate());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
days = 3
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unknown_planner_mode_rejected_at_parse() {
        let toml = r#"
[planner]
mode = "sometimes"
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = ScenarioConfig::from_toml_str("[simulation]\nseed = 99\n").unwrap();
        assert_eq!(cfg.simulation.seed, 99);
        assert_eq!(cfg.simulation.days, 30);
        assert_eq!(cfg.market.price_grid.len(), 101);
        assert_eq!(cfg.market.price_grid[100], 200.0);
    }

    #[test]
    fn validation_catches_missing_fuels() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.variables.remove("fuel.gas");
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "variables.fuel.gas"));
    }

    #[test]
    fn validation_catches_unknown_kind() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.variables.insert(
            "cap.gas".to_string(),
            single("odd", DistConfig::of_kind("gamma")),
        );
        let errors = cfg.validate();
        assert!(
            errors
                .iter()
                .any(|e| e.field.starts_with("variables.cap.gas.regimes[0]")),
            "{errors:?}"
        );
    }

    #[test]
    fn validation_requires_global_settings_for_hybrid() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.planner.mode = PlannerMode::Hybrid;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "planner.global"));
    }

    #[test]
    fn validation_requires_direct_mode_variables() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.renewables.mode = RenewableMode::Direct;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "variables.avail.wind"));
        assert!(errors.iter().any(|e| e.field == "variables.avail.solar"));
    }

    #[test]
    fn validation_catches_non_negative_slope_and_empty_grid() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.demand.slope = 0.0;
        cfg.market.price_grid.clear();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "demand.slope"));
        assert!(errors.iter().any(|e| e.field == "market.price_grid"));
    }

    #[test]
    fn validation_catches_bad_outage_month() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.outages.months = vec![0, 13];
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "outages.months"));
    }

    fn stochastic(days: usize, n: usize, min: usize, max: usize) -> ScenarioConfig {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.days = days;
        cfg.planner.mode = PlannerMode::Global;
        cfg.planner.global = Some(GlobalSettings {
            n_regimes: n,
            stochastic: Some(StochasticBreakpoints {
                enabled: true,
                min_segment_days: min,
                max_segment_days: max,
                transition_hours: TransitionHours::default(),
            }),
            ..GlobalSettings::default()
        });
        cfg
    }

    #[test]
    fn stochastic_segments_too_long_for_horizon() {
        let errors = stochastic(60, 4, 30, 60).validate();
        assert!(
            errors
                .iter()
                .any(|e| e.field == "planner.global.stochastic.min_segment_days"),
            "{errors:?}"
        );
    }

    #[test]
    fn stochastic_segments_too_short_for_horizon() {
        let errors = stochastic(365, 2, 30, 60).validate();
        assert!(
            errors
                .iter()
                .any(|e| e.field == "planner.global.stochastic.max_segment_days"),
            "{errors:?}"
        );
    }

    #[test]
    fn stochastic_segments_that_fit_are_accepted() {
        assert!(stochastic(60, 3, 10, 30).validate().is_empty());
        // Disabled stochastic placement is not checked against the horizon.
        let mut cfg = stochastic(60, 4, 30, 60);
        if let Some(g) = cfg.planner.global.as_mut() {
            g.stochastic.as_mut().unwrap().enabled = false;
        }
        assert!(cfg.validate().is_empty());
    }
}
