//! Regime timelines: planning breakpoints and sampling blended values.

pub mod planner;
pub mod schedule;

pub use planner::{PlannedRegime, Timeline, plan};
pub use schedule::{Blend, Breakpoint, Regime, SamplerState, VariableSchedule};

use tracing::info;

use crate::config::ScenarioConfig;
use crate::dists::DistSpec;
use crate::empirical::SeriesMap;
use crate::error::ConfigError;

/// Plans and builds one [`VariableSchedule`] per configured variable, in name order.
///
/// # Errors
///
/// Returns the first `ConfigError` from planning, distribution conversion,
/// or schedule construction.
pub fn build_schedules(
    cfg: &ScenarioConfig,
    series: &SeriesMap,
) -> Result<Vec<VariableSchedule>, ConfigError> {
    let mut schedules = Vec::new();
    for (name, timeline) in plan(cfg)? {
        let regimes = timeline
            .regimes
            .iter()
            .map(|r| {
                Ok(Regime {
                    name: r.name.clone(),
                    dist: DistSpec::from_config(&r.dist, &r.field)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        schedules.push(VariableSchedule::new(
            name,
            cfg.simulation.start,
            regimes,
            timeline.breakpoints,
            series,
        )?);
    }
    info!(
        variables = schedules.len(),
        mode = ?cfg.planner.mode,
        "built regime schedules"
    );
    Ok(schedules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_builds_all_variables() {
        let cfg = ScenarioConfig::baseline();
        let schedules = build_schedules(&cfg, &SeriesMap::new()).unwrap();
        assert_eq!(schedules.len(), cfg.variables.len());
        assert!(schedules.iter().any(|s| s.name() == "fuel.gas"));
    }

    #[test]
    fn gas_crisis_breakpoints_follow_config() {
        let cfg = ScenarioConfig::gas_crisis();
        let schedules = build_schedules(&cfg, &SeriesMap::new()).unwrap();
        let gas = schedules.iter().find(|s| s.name() == "fuel.gas").unwrap();
        assert_eq!(gas.breakpoints().len(), 2);
        assert_eq!(gas.regimes()[1].name, "crisis");
    }

    #[test]
    fn unloaded_series_fails_construction() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.variables.insert(
            "fuel.gas".into(),
            crate::config::VariableConfig {
                regimes: vec![crate::config::RegimeConfig {
                    name: "hist".into(),
                    dist: crate::config::DistConfig::empirical("ttf", "level"),
                    breakpoints: Vec::new(),
                }],
            },
        );
        let err = build_schedules(&cfg, &SeriesMap::new()).unwrap_err();
        assert!(err.message.contains("ttf"));
    }
}
