//! Synthetic hourly electricity-market simulator.
//!
//! Each hour, regime-switching stochastic inputs are resolved, a merit-order
//! supply curve and a seasonal demand curve are built, and the market is
//! cleared on a price grid.

/// Scenario configuration, presets and validation.
pub mod config;
pub mod demand;
/// Parametric and empirical distributions.
pub mod dists;
pub mod empirical;
pub mod equilibrium;
pub mod error;
pub mod io;
/// Regime timelines and blended sampling.
pub mod regimes;
/// Simulation clock, engine, output records and summaries.
pub mod sim;
pub mod supply;

pub use config::ScenarioConfig;
pub use error::{ConfigError, SimError};
pub use sim::{Engine, OutputRecord, RunSummary, simulate};
