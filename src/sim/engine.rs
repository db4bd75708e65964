//! Simulation loop that resolves variables, builds curves and clears each hour.

use rand::{SeedableRng, rngs::StdRng};
use tracing::{debug, info, warn};

use crate::config::ScenarioConfig;
use crate::demand::DemandModel;
use crate::empirical::SeriesMap;
use crate::equilibrium::{EquilibriumSolver, PriceGrid};
use crate::error::{ConfigError, SimError};
use crate::regimes::{SamplerState, VariableSchedule, build_schedules};
use crate::supply::{RenewableSourcing, SupplyCurveBuilder};

use super::clock::Clock;
use super::types::{OutputRecord, RegimeLabels, ResolvedValues};

/// Simulation engine owning schedules, sampler state and the run's RNG.
///
/// One engine is one run: nothing is shared with other engines, so
/// independent runs may execute on separate threads.
pub struct Engine {
    start: chrono::NaiveDateTime,
    hours: usize,
    seed: u64,
    rng: StdRng,
    state: SamplerState,
    series: SeriesMap,
    schedules: Vec<VariableSchedule>,
    sourcing: RenewableSourcing,
    supply: SupplyCurveBuilder,
    demand: DemandModel,
    solver: EquilibriumSolver,
}

impl Engine {
    /// Validates the scenario and builds every schedule and model.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` from validation or schedule
    /// construction; nothing is simulated in that case.
    pub fn new(cfg: &ScenarioConfig, series: SeriesMap) -> Result<Self, ConfigError> {
        if let Some(err) = cfg.validate().into_iter().next() {
            return Err(err);
        }
        let schedules = build_schedules(cfg, &series)?;
        let grid = PriceGrid::new(cfg.market.price_grid.clone())?;
        let seed = cfg.simulation.seed;

        Ok(Self {
            start: cfg.simulation.start,
            hours: cfg.hours(),
            seed,
            rng: StdRng::seed_from_u64(seed),
            state: SamplerState::new(),
            series,
            schedules,
            sourcing: RenewableSourcing::from_config(&cfg.renewables, seed)?,
            supply: SupplyCurveBuilder::new(cfg.outages.clone()),
            demand: DemandModel::new(cfg.demand.clone()),
            solver: EquilibriumSolver::new(grid, cfg.market.clamp_policy),
        })
    }

    /// Number of hours a full run produces.
    pub fn hours(&self) -> usize {
        self.hours
    }

    /// Sampler state as of the last simulated hour.
    pub fn sampler_state(&self) -> &SamplerState {
        &self.state
    }

    /// Simulates one hour.
    ///
    /// Hours must be stepped in order: stateful processes carry over from
    /// the previous call.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EquilibriumNotFound`] when the hour cannot clear
    /// and the clamp policy is strict.
    pub fn step(&mut self, ts: chrono::NaiveDateTime) -> Result<OutputRecord, SimError> {
        let mut values = ResolvedValues::new();
        let mut regimes = RegimeLabels::new();
        for schedule in &self.schedules {
            let (value, label) = schedule.sample(ts, &mut self.rng, &mut self.state, &self.series);
            values.insert(schedule.name().to_string(), value);
            regimes.insert(schedule.name().to_string(), label.to_string());
        }
        self.sourcing.apply(ts, &mut values);

        let supply = self.supply.build(ts, &values);
        let demand = self.demand.curve_at(ts);
        let clearing = self.solver.solve(ts, &supply, &demand)?;
        if clearing.status.is_clamped() {
            warn!(
                %ts,
                price = clearing.price,
                quantity = clearing.quantity,
                status = %clearing.status,
                "no equilibrium inside price grid, clamped"
            );
        }

        Ok(OutputRecord {
            timestamp: ts,
            price: clearing.price,
            quantity: clearing.quantity,
            status: clearing.status,
            dispatch: clearing.dispatch,
            available: supply.available().clone(),
            values,
            regimes,
        })
    }

    /// Runs every hour of the horizon and returns the records in order.
    ///
    /// # Errors
    ///
    /// Stops at the first hour that fails under the strict clamp policy.
    pub fn run(&mut self) -> Result<Vec<OutputRecord>, SimError> {
        info!(
            start = %self.start,
            hours = self.hours,
            seed = self.seed,
            variables = self.schedules.len(),
            "simulation started"
        );
        let mut records = Vec::with_capacity(self.hours);
        let mut day_price = 0.0;
        for (step, ts) in Clock::new(self.start, self.hours) {
            let record = self.step(ts)?;
            day_price += record.price;
            if (step + 1) % 24 == 0 {
                debug!(day = %ts.date(), mean_price = day_price / 24.0, "simulated day");
                day_price = 0.0;
            }
            records.push(record);
        }
        let clamped = records.iter().filter(|r| r.status.is_clamped()).count();
        info!(hours = records.len(), clamped, "simulation finished");
        Ok(records)
    }
}

/// Builds an engine for `cfg` and runs it to completion.
///
/// # Errors
///
/// Returns `SimError::Configuration` for invalid scenarios and
/// `SimError::EquilibriumNotFound` for strict-mode clearing failures.
pub fn simulate(cfg: &ScenarioConfig, series: SeriesMap) -> Result<Vec<OutputRecord>, SimError> {
    Engine::new(cfg, series)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenewableMode;

    fn short(days: usize) -> ScenarioConfig {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.days = days;
        cfg
    }

    #[test]
    fn run_produces_one_record_per_hour() {
        let records = simulate(&short(2), SeriesMap::new()).unwrap();
        assert_eq!(records.len(), 48);
        assert_eq!(
            records[1].timestamp - records[0].timestamp,
            chrono::TimeDelta::hours(1)
        );
    }

    #[test]
    fn records_carry_values_and_labels() {
        let records = simulate(&short(1), SeriesMap::new()).unwrap();
        let r = &records[0];
        assert!(r.values.contains_key("fuel.gas"));
        assert!(r.values.contains_key("avail.wind"));
        assert!(r.values.contains_key("avail.solar"));
        assert_eq!(r.regimes["fuel.gas"], "stable");
    }

    #[test]
    fn invalid_config_rejected_before_running() {
        let mut cfg = short(1);
        cfg.simulation.days = 0;
        let err = Engine::new(&cfg, SeriesMap::new()).err().unwrap();
        assert_eq!(err.field, "simulation.days");
    }

    #[test]
    fn direct_mode_uses_scheduled_availability() {
        let mut cfg = short(1);
        cfg.renewables.mode = RenewableMode::Direct;
        for (name, v) in [("avail.wind", 0.3), ("avail.solar", 0.2)] {
            cfg.variables.insert(
                name.into(),
                crate::config::VariableConfig {
                    regimes: vec![crate::config::RegimeConfig {
                        name: "fixed".into(),
                        dist: crate::config::DistConfig::constant(v),
                        breakpoints: Vec::new(),
                    }],
                },
            );
        }
        let records = simulate(&cfg, SeriesMap::new()).unwrap();
        assert!(records.iter().all(|r| r.values["avail.wind"] == 0.3));
        assert!(records.iter().all(|r| r.values["avail.solar"] == 0.2));
    }

    #[test]
    fn sampler_state_is_threaded_across_hours() {
        let mut engine = Engine::new(&short(1), SeriesMap::new()).unwrap();
        engine.run().unwrap();
        assert!(engine.sampler_state().last("fuel.gas", "stable").is_some());
    }
}
