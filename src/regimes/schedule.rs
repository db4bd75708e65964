//! Per-variable regime timelines and the blend-aware scheduler.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rand::rngs::StdRng;

use crate::dists::{DistSpec, SampleContext};
use crate::empirical::SeriesMap;
use crate::error::ConfigError;

/// Dated handover from one regime to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    /// Activation time of the incoming regime.
    pub at: NaiveDateTime,
    /// Length of the blend window that ends at `at`. Zero means a hard switch.
    pub transition_hours: u32,
}

/// A named distribution on a variable's timeline.
#[derive(Debug, Clone)]
pub struct Regime {
    pub name: String,
    pub dist: DistSpec,
}

/// Which regimes contribute at a timestamp, and how much.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blend {
    /// Index of the regime whose segment contains the timestamp.
    pub active: usize,
    /// Next regime and its weight `w` in `(0, 1)` inside a transition window.
    pub incoming: Option<(usize, f64)>,
}

impl Blend {
    /// Weight carried by the active regime; exactly 1.0 outside transition windows.
    pub fn active_weight(&self) -> f64 {
        self.incoming.map_or(1.0, |(_, w)| 1.0 - w)
    }

    /// Weight carried by the incoming regime; 0.0 outside transition windows.
    pub fn incoming_weight(&self) -> f64 {
        self.incoming.map_or(0.0, |(_, w)| w)
    }
}

/// Previous-value slots for stateful distributions.
///
/// Keyed by `(variable, regime name)`. A slot survives for the whole run, so a
/// regime that becomes active again resumes from where it left off, and the
/// two sides of a blend never share a process.
#[derive(Debug, Clone, Default)]
pub struct SamplerState {
    slots: HashMap<(String, String), Option<f64>>,
}

impl SamplerState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable slot for one stateful process, created empty on first use.
    pub fn slot(&mut self, variable: &str, regime: &str) -> &mut Option<f64> {
        self.slots
            .entry((variable.to_string(), regime.to_string()))
            .or_insert(None)
    }

    /// Last value of a stateful process, if it has been sampled.
    pub fn last(&self, variable: &str, regime: &str) -> Option<f64> {
        self.slots
            .get(&(variable.to_string(), regime.to_string()))
            .copied()
            .flatten()
    }
}

/// Ordered regimes for one variable.
///
/// Breakpoint `i` hands `regimes[i]` over to `regimes[i + 1]`; after the last
/// breakpoint the final regime stays active indefinitely.
#[derive(Debug, Clone)]
pub struct VariableSchedule {
    name: String,
    start: NaiveDateTime,
    regimes: Vec<Regime>,
    breakpoints: Vec<Breakpoint>,
}

impl VariableSchedule {
    /// Builds a schedule whose first regime is active from `start`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the variable when there are no regimes,
    /// the regime and breakpoint counts disagree, breakpoints go backwards in
    /// time, or an empirical regime references a series that was not loaded.
    pub fn new(
        name: impl Into<String>,
        start: NaiveDateTime,
        regimes: Vec<Regime>,
        breakpoints: Vec<Breakpoint>,
        series: &SeriesMap,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let field = format!("variables.{name}");
        if regimes.is_empty() {
            return Err(ConfigError::new(field, "at least one regime is required"));
        }
        if regimes.len() != breakpoints.len() + 1 {
            return Err(ConfigError::new(
                field,
                format!(
                    "{} regimes cannot be separated by {} breakpoints",
                    regimes.len(),
                    breakpoints.len()
                ),
            ));
        }
        if breakpoints.windows(2).any(|w| w[1].at < w[0].at) {
            return Err(ConfigError::new(
                format!("{field}.breakpoints"),
                "breakpoints must be non-decreasing in time",
            ));
        }
        for regime in &regimes {
            if let Some(series_name) = regime.dist.empirical_series() {
                if !series.contains_key(series_name) {
                    return Err(ConfigError::new(
                        format!("{field}.{}", regime.name),
                        format!("empirical series \"{series_name}\" is not loaded"),
                    ));
                }
            }
        }

        Ok(Self {
            name,
            start,
            regimes,
            breakpoints,
        })
    }

    /// Variable name, e.g. `"fuel.gas"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn regimes(&self) -> &[Regime] {
        &self.regimes
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    fn activation(&self, idx: usize) -> NaiveDateTime {
        match idx {
            0 => self.start,
            i => self.breakpoints[i - 1].at,
        }
    }

    /// Resolves the active regime and blend weight at `ts`.
    pub fn blend_at(&self, ts: NaiveDateTime) -> Blend {
        let active = self.breakpoints.partition_point(|b| b.at <= ts);
        let incoming = self.breakpoints.get(active).and_then(|next| {
            if next.transition_hours == 0 {
                return None;
            }
            let window = f64::from(next.transition_hours);
            let hours_until = (next.at - ts).num_seconds() as f64 / 3600.0;
            if hours_until > 0.0 && hours_until < window {
                let w = ((window - hours_until) / window).clamp(0.0, 1.0);
                Some((active + 1, w))
            } else {
                None
            }
        });
        Blend { active, incoming }
    }

    fn draw(
        &self,
        idx: usize,
        ts: NaiveDateTime,
        rng: &mut StdRng,
        slot: &mut Option<f64>,
        series: &SeriesMap,
    ) -> f64 {
        let since = (ts - self.activation(idx)).num_seconds() as f64 / 3600.0;
        let ctx = SampleContext {
            ts,
            hours_active: since.max(0.0),
            series,
        };
        self.regimes[idx].dist.sample(rng, &ctx, slot)
    }

    fn sample_regime(
        &self,
        idx: usize,
        ts: NaiveDateTime,
        rng: &mut StdRng,
        state: &mut SamplerState,
        series: &SeriesMap,
    ) -> f64 {
        let regime = &self.regimes[idx];
        if regime.dist.is_stateful() {
            self.draw(idx, ts, rng, state.slot(&self.name, &regime.name), series)
        } else {
            self.draw(idx, ts, rng, &mut None, series)
        }
    }

    /// Samples the variable at `ts`.
    ///
    /// Inside a transition window the outgoing and incoming regimes are
    /// sampled independently and mixed as `(1 - w) * outgoing + w * incoming`.
    /// When both sides share a state slot (same regime name), the incoming
    /// side draws from a copy of the slot taken before the outgoing draw, so
    /// the process advances exactly one step per hour.
    /// Returns the value and the label of the active regime.
    pub fn sample(
        &self,
        ts: NaiveDateTime,
        rng: &mut StdRng,
        state: &mut SamplerState,
        series: &SeriesMap,
    ) -> (f64, &str) {
        let blend = self.blend_at(ts);
        let shared = blend.incoming.and_then(|(next, _)| {
            let incoming = &self.regimes[next];
            (incoming.dist.is_stateful() && incoming.name == self.regimes[blend.active].name)
                .then(|| state.last(&self.name, &incoming.name))
        });
        let outgoing = self.sample_regime(blend.active, ts, rng, state, series);
        let value = match blend.incoming {
            Some((next, w)) => {
                let incoming = match shared {
                    Some(mut scratch) => self.draw(next, ts, rng, &mut scratch, series),
                    None => self.sample_regime(next, ts, rng, state, series),
                };
                (1.0 - w) * outgoing + w * incoming
            }
            None => outgoing,
        };
        (value, &self.regimes[blend.active].name)
    }
}
