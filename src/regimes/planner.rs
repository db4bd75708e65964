//! Timing-mode resolution: turns `local_only` / `global` / `hybrid` settings
//! into one concrete regime list and breakpoint list per variable.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::config::{
    BreakpointConfig, DistConfig, GlobalSettings, PlannerMode, ScenarioConfig, TransitionHours,
    VariableConfig,
};
use crate::error::ConfigError;
use crate::regimes::schedule::Breakpoint;

/// Seed offset for the planner's RNG, keeping breakpoint draws independent of sampling.
pub const PLANNER_SEED_OFFSET: u64 = 101;

/// Transition length used by equal splits.
const DEFAULT_TRANSITION_HOURS: u32 = 24;

/// Regime definition after cycling to the planned segment count.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRegime {
    pub name: String,
    pub dist: DistConfig,
    /// Config path of the distribution, for error messages.
    pub field: String,
}

/// Fully resolved timeline for one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub regimes: Vec<PlannedRegime>,
    pub breakpoints: Vec<Breakpoint>,
}

/// Simulation horizon `[start, end)`.
#[derive(Debug, Clone, Copy)]
struct Horizon {
    start: NaiveDateTime,
    end: NaiveDateTime,
    days: usize,
}

impl Horizon {
    fn day(&self, offset: usize) -> NaiveDateTime {
        self.start + TimeDelta::days(offset as i64)
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

/// Converts configured breakpoints to handovers strictly inside the horizon, sorted.
fn explicit_breakpoints(horizon: Horizon, bps: &[BreakpointConfig]) -> Vec<Breakpoint> {
    let mut out: Vec<Breakpoint> = bps
        .iter()
        .map(|b| Breakpoint {
            at: midnight(b.date),
            transition_hours: b.transition_hours,
        })
        .filter(|b| b.at > horizon.start && b.at < horizon.end)
        .collect();
    out.sort_by_key(|b| b.at);
    out
}

/// Segment lengths in days as close to equal as possible, longer ones first.
fn equal_splits(days: usize, n: usize) -> Vec<usize> {
    let n = n.max(1);
    let base = days / n;
    let rem = days % n;
    (0..n).map(|i| base + usize::from(i < rem)).collect()
}

/// Random composition of `days` into `n` parts, each within `[min, max]` when possible.
fn random_partition(days: usize, n: usize, min: usize, max: usize, rng: &mut StdRng) -> Vec<usize> {
    let n = n.max(1);
    let min = min.min(days / n);
    let remaining = days - n * min;
    if remaining == 0 {
        return vec![min; n];
    }

    // Stars and bars over `remaining` extra days.
    let mut cuts: Vec<usize> = index::sample(rng, remaining + n - 1, n - 1).into_vec();
    cuts.sort_unstable();
    let mut parts = Vec::with_capacity(n);
    let mut prev: isize = -1;
    for c in cuts.iter().copied().chain(std::iter::once(remaining + n - 1)) {
        parts.push(min + (c as isize - prev - 1) as usize);
        prev = c as isize;
    }

    // Move overflow from segments above `max` into ones with room.
    let cap = max.max(min);
    let mut spill = 0;
    for p in &mut parts {
        if *p > cap {
            spill += *p - cap;
            *p = cap;
        }
    }
    for p in &mut parts {
        if spill == 0 {
            break;
        }
        let room = cap - *p;
        let moved = room.min(spill);
        *p += moved;
        spill -= moved;
    }
    if let Some(last) = parts.last_mut() {
        *last += spill;
    }
    parts
}

fn breakpoints_from_segments(horizon: Horizon, days: &[usize], hours: &[u32]) -> Vec<Breakpoint> {
    let mut offset = 0;
    days.iter()
        .zip(hours)
        .take(days.len().saturating_sub(1))
        .map(|(d, th)| {
            offset += d;
            Breakpoint {
                at: horizon.day(offset),
                transition_hours: *th,
            }
        })
        .filter(|b| b.at < horizon.end)
        .collect()
}

/// Shared segmentation for `global` and `hybrid` modes.
fn global_breakpoints(horizon: Horizon, g: &GlobalSettings, rng: &mut StdRng) -> Vec<Breakpoint> {
    if !g.breakpoints.is_empty() {
        return explicit_breakpoints(horizon, &g.breakpoints);
    }
    match &g.stochastic {
        Some(st) if st.enabled => {
            let days = random_partition(
                horizon.days,
                g.n_regimes,
                st.min_segment_days,
                st.max_segment_days,
                rng,
            );
            let hours: Vec<u32> = days
                .iter()
                .map(|_| match st.transition_hours {
                    TransitionHours::Fixed { value } => value,
                    TransitionHours::Range { min, max } => rng.random_range(min..=max.max(min)),
                })
                .collect();
            breakpoints_from_segments(horizon, &days, &hours)
        }
        _ => {
            let days = equal_splits(horizon.days, g.n_regimes);
            let hours = vec![DEFAULT_TRANSITION_HOURS; days.len()];
            breakpoints_from_segments(horizon, &days, &hours)
        }
    }
}

fn local_regimes(name: &str, var: &VariableConfig) -> Vec<PlannedRegime> {
    var.regimes
        .iter()
        .enumerate()
        .map(|(i, r)| PlannedRegime {
            name: r.name.clone(),
            dist: r.dist.clone(),
            field: format!("variables.{name}.regimes[{i}].dist"),
        })
        .collect()
}

fn local_breakpoints(horizon: Horizon, var: &VariableConfig) -> Vec<Breakpoint> {
    let all: Vec<BreakpointConfig> = var
        .regimes
        .iter()
        .flat_map(|r| r.breakpoints.iter().cloned())
        .collect();
    explicit_breakpoints(horizon, &all)
}

fn template_regimes(
    name: &str,
    g: &GlobalSettings,
    count: usize,
    mode: PlannerMode,
) -> Result<Vec<PlannedRegime>, ConfigError> {
    let dist = g.templates.get(name).ok_or_else(|| {
        ConfigError::new(
            format!("variables.{name}"),
            format!("no regimes and no template in planner.global.templates ({mode:?} mode)"),
        )
    })?;
    Ok((0..count)
        .map(|i| PlannedRegime {
            name: format!("{name}_regime_{}", i + 1),
            dist: dist.clone(),
            field: format!("planner.global.templates.{name}"),
        })
        .collect())
}

/// Repeats or truncates `regimes` so there is one per segment.
fn fit(regimes: Vec<PlannedRegime>, segments: usize) -> Vec<PlannedRegime> {
    if regimes.len() == segments {
        return regimes;
    }
    regimes.into_iter().cycle().take(segments).collect()
}

/// Resolves every configured variable into a [`Timeline`].
///
/// Stochastic global breakpoints are drawn once from an RNG seeded with
/// `seed + PLANNER_SEED_OFFSET`, so every variable sees the same segmentation.
///
/// # Errors
///
/// Returns a `ConfigError` when `global`/`hybrid` mode lacks
/// `planner.global`, or a variable has neither regimes nor a template.
pub fn plan(cfg: &ScenarioConfig) -> Result<Vec<(String, Timeline)>, ConfigError> {
    let start = cfg.simulation.start;
    let horizon = Horizon {
        start,
        end: start + TimeDelta::hours(cfg.hours() as i64),
        days: cfg.simulation.days,
    };
    let mode = cfg.planner.mode;

    let global = match mode {
        PlannerMode::LocalOnly => None,
        PlannerMode::Global | PlannerMode::Hybrid => {
            let g = cfg.planner.global.as_ref().ok_or_else(|| {
                ConfigError::new("planner.global", "required for global and hybrid modes")
            })?;
            let mut rng = StdRng::seed_from_u64(cfg.simulation.seed.wrapping_add(PLANNER_SEED_OFFSET));
            Some((g, global_breakpoints(horizon, g, &mut rng)))
        }
    };

    let mut out = Vec::with_capacity(cfg.variables.len());
    for (name, var) in &cfg.variables {
        let local = local_breakpoints(horizon, var);
        let timeline = match (&global, var.regimes.is_empty()) {
            (None, true) => {
                return Err(ConfigError::new(
                    format!("variables.{name}.regimes"),
                    "must not be empty in local_only mode",
                ));
            }
            (None, false) => {
                let breakpoints = if local.is_empty() {
                    let days = equal_splits(horizon.days, var.regimes.len());
                    let hours = vec![DEFAULT_TRANSITION_HOURS; days.len()];
                    breakpoints_from_segments(horizon, &days, &hours)
                } else {
                    local
                };
                Timeline {
                    regimes: fit(local_regimes(name, var), breakpoints.len() + 1),
                    breakpoints,
                }
            }
            (Some((g, shared)), true) => Timeline {
                regimes: template_regimes(name, g, shared.len() + 1, mode)?,
                breakpoints: shared.clone(),
            },
            (Some((_, shared)), false) => {
                let breakpoints = if mode == PlannerMode::Hybrid && !local.is_empty() {
                    local
                } else {
                    shared.clone()
                };
                Timeline {
                    regimes: fit(local_regimes(name, var), breakpoints.len() + 1),
                    breakpoints,
                }
            }
        };
        out.push((name.clone(), timeline));
    }
    Ok(out)
}
