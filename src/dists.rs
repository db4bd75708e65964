//! Distribution specs and the sampler behind every scheduled variable.
//!
//! Scenario files describe distributions as loose tables ([`DistConfig`]).
//! They are converted once into the closed [`DistKind`] enum, so unknown
//! kinds and missing parameters surface before the first hour is simulated.
//! The sampler itself never owns randomness or state: callers pass the
//! run's RNG and the previous-value slot explicitly.

use chrono::NaiveDateTime;
use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::{Beta, Distribution, LogNormal, Normal};

use crate::config::DistConfig;
use crate::empirical::{SeriesMap, Transform};
use crate::error::ConfigError;

/// Maximum rejection-sampling attempts for `truncnormal` before clipping.
const TRUNC_MAX_TRIES: usize = 1000;

/// Value-generating process for one regime.
#[derive(Debug, Clone)]
pub enum DistKind {
    Const { v: f64 },
    Normal(Normal<f64>),
    LogNormal(LogNormal<f64>),
    /// Beta(alpha, beta) rescaled from `[0, 1]` to `[low, high]`.
    Beta { dist: Beta<f64>, low: f64, high: f64 },
    Uniform { min: f64, max: f64 },
    /// Normal draws rejected outside `[low, high]`, clipped after too many misses.
    TruncNormal { dist: Normal<f64>, low: f64, high: f64 },
    /// `start + slope * hours_since_regime_start`.
    Linear { start: f64, slope: f64 },
    /// `mu + phi * (prev - mu) + noise`, starting from `mu`.
    Ar1 { mu: f64, phi: f64, noise: Normal<f64> },
    /// `prev + drift + noise`, starting from `start`.
    RandomWalk { start: f64, drift: f64, noise: Normal<f64> },
    /// Lookup into a named empirical series.
    Empirical { name: String, transform: Transform },
}

/// Inclusive clamp range; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl Bounds {
    /// Clamps `x` into the range. Never resamples.
    pub fn apply(&self, x: f64) -> f64 {
        let x = self.low.map_or(x, |lo| x.max(lo));
        self.high.map_or(x, |hi| x.min(hi))
    }
}

/// A validated distribution plus its clamp range.
#[derive(Debug, Clone)]
pub struct DistSpec {
    pub kind: DistKind,
    pub bounds: Bounds,
}

/// Per-call inputs that are not randomness or state.
#[derive(Debug, Clone, Copy)]
pub struct SampleContext<'a> {
    /// Timestamp being simulated.
    pub ts: NaiveDateTime,
    /// Hours since the sampled regime became active (0 before activation).
    pub hours_active: f64,
    /// Pre-loaded empirical series.
    pub series: &'a SeriesMap,
}

fn required(cfg: &DistConfig, value: Option<f64>, param: &str, field: &str) -> Result<f64, ConfigError> {
    let v = value.ok_or_else(|| {
        ConfigError::new(
            format!("{field}.{param}"),
            format!("required for kind \"{}\"", cfg.kind),
        )
    })?;
    if !v.is_finite() {
        return Err(ConfigError::new(format!("{field}.{param}"), "must be finite"));
    }
    Ok(v)
}

fn optional(value: Option<f64>, default: f64, param: &str, field: &str) -> Result<f64, ConfigError> {
    let v = value.unwrap_or(default);
    if !v.is_finite() {
        return Err(ConfigError::new(format!("{field}.{param}"), "must be finite"));
    }
    Ok(v)
}

fn normal(mu: f64, sigma: f64, field: &str) -> Result<Normal<f64>, ConfigError> {
    Normal::new(mu, sigma)
        .map_err(|e| ConfigError::new(format!("{field}.sigma"), e.to_string()))
}

impl DistSpec {
    /// Converts a raw distribution table into a validated spec.
    ///
    /// `field` is the dotted path used in error messages, e.g.
    /// `variables.fuel.gas.regimes[1].dist`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for unknown kinds, unknown empirical
    /// transforms, missing mandatory parameters, and parameters the
    /// underlying distribution rejects.
    pub fn from_config(cfg: &DistConfig, field: &str) -> Result<Self, ConfigError> {
        let kind = match cfg.kind.to_ascii_lowercase().as_str() {
            "const" => DistKind::Const {
                v: required(cfg, cfg.v, "v", field)?,
            },
            "normal" => {
                let mu = required(cfg, cfg.mu, "mu", field)?;
                let sigma = required(cfg, cfg.sigma, "sigma", field)?;
                DistKind::Normal(normal(mu, sigma, field)?)
            }
            "lognormal" => {
                let mu = required(cfg, cfg.mu, "mu", field)?;
                let sigma = required(cfg, cfg.sigma, "sigma", field)?;
                DistKind::LogNormal(
                    LogNormal::new(mu, sigma)
                        .map_err(|e| ConfigError::new(format!("{field}.sigma"), e.to_string()))?,
                )
            }
            "beta" => {
                let alpha = required(cfg, cfg.alpha, "alpha", field)?;
                let beta = required(cfg, cfg.beta, "beta", field)?;
                let dist = Beta::new(alpha, beta)
                    .map_err(|e| ConfigError::new(format!("{field}.alpha"), e.to_string()))?;
                DistKind::Beta {
                    dist,
                    low: optional(cfg.low, 0.0, "low", field)?,
                    high: optional(cfg.high, 1.0, "high", field)?,
                }
            }
            "uniform" => {
                let min = optional(cfg.min, 0.0, "min", field)?;
                let max = optional(cfg.max, 1.0, "max", field)?;
                if min > max {
                    return Err(ConfigError::new(format!("{field}.min"), "must be <= max"));
                }
                DistKind::Uniform { min, max }
            }
            "truncnormal" => {
                let mu = required(cfg, cfg.mu, "mu", field)?;
                let sigma = required(cfg, cfg.sigma, "sigma", field)?;
                let low = required(cfg, cfg.low, "low", field)?;
                let high = required(cfg, cfg.high, "high", field)?;
                if low > high {
                    return Err(ConfigError::new(format!("{field}.low"), "must be <= high"));
                }
                DistKind::TruncNormal {
                    dist: normal(mu, sigma, field)?,
                    low,
                    high,
                }
            }
            "linear" => DistKind::Linear {
                start: optional(cfg.start, 0.0, "start", field)?,
                slope: optional(cfg.slope, 0.0, "slope", field)?,
            },
            "ar1" => {
                let mu = required(cfg, cfg.mu, "mu", field)?;
                let sigma = optional(cfg.sigma, 1.0, "sigma", field)?;
                DistKind::Ar1 {
                    mu,
                    phi: optional(cfg.phi, 0.9, "phi", field)?,
                    noise: normal(0.0, sigma, field)?,
                }
            }
            "randomwalk" | "rw" => {
                let sigma = optional(cfg.sigma, 1.0, "sigma", field)?;
                DistKind::RandomWalk {
                    start: optional(cfg.start, 0.0, "start", field)?,
                    drift: optional(cfg.drift, 0.0, "drift", field)?,
                    noise: normal(0.0, sigma, field)?,
                }
            }
            "empirical" => {
                let name = cfg.name.clone().ok_or_else(|| {
                    ConfigError::new(format!("{field}.name"), "required for kind \"empirical\"")
                })?;
                let transform = match cfg.transform.as_deref() {
                    None => Transform::Level,
                    Some(t) => Transform::parse(t).ok_or_else(|| {
                        ConfigError::new(
                            format!("{field}.transform"),
                            format!("unknown transform \"{t}\""),
                        )
                    })?,
                };
                DistKind::Empirical { name, transform }
            }
            other => {
                return Err(ConfigError::new(
                    format!("{field}.kind"),
                    format!("unknown distribution kind \"{other}\""),
                ));
            }
        };

        let bounds = cfg
            .bounds
            .map(|b| Bounds {
                low: b.low,
                high: b.high,
            })
            .unwrap_or_default();
        if let (Some(lo), Some(hi)) = (bounds.low, bounds.high) {
            if lo > hi {
                return Err(ConfigError::new(
                    format!("{field}.bounds"),
                    "low must be <= high",
                ));
            }
        }

        Ok(Self { kind, bounds })
    }

    /// Name of the empirical series this spec reads, if any.
    pub fn empirical_series(&self) -> Option<&str> {
        match &self.kind {
            DistKind::Empirical { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether the value depends on the previous sample.
    pub fn is_stateful(&self) -> bool {
        matches!(self.kind, DistKind::Ar1 { .. } | DistKind::RandomWalk { .. })
    }

    /// Draws the next value and clamps it.
    ///
    /// `state` holds the previous clamped value for stateful
    /// kinds and is updated in place; stateless kinds leave it untouched.
    /// Empirical series presence is checked when schedules are built, so a
    /// missing name here samples as 0.
    pub fn sample(&self, rng: &mut StdRng, ctx: &SampleContext<'_>, state: &mut Option<f64>) -> f64 {
        let raw = match &self.kind {
            DistKind::Const { v } => *v,
            DistKind::Normal(d) => d.sample(rng),
            DistKind::LogNormal(d) => d.sample(rng),
            DistKind::Beta { dist, low, high } => low + dist.sample(rng) * (high - low),
            DistKind::Uniform { min, max } => min + rng.random::<f64>() * (max - min),
            DistKind::TruncNormal { dist, low, high } => {
                let mut x = dist.sample(rng);
                let mut tries = 1;
                while !(*low..=*high).contains(&x) && tries < TRUNC_MAX_TRIES {
                    x = dist.sample(rng);
                    tries += 1;
                }
                x.clamp(*low, *high)
            }
            DistKind::Linear { start, slope } => start + slope * ctx.hours_active,
            DistKind::Ar1 { mu, phi, noise } => {
                let prev = state.unwrap_or(*mu);
                let next = self.bounds.apply(mu + phi * (prev - mu) + noise.sample(rng));
                *state = Some(next);
                return next;
            }
            DistKind::RandomWalk { start, drift, noise } => {
                let prev = state.unwrap_or(*start);
                let next = self.bounds.apply(prev + drift + noise.sample(rng));
                *state = Some(next);
                return next;
            }
            DistKind::Empirical { name, transform } => ctx
                .series
                .get(name)
                .map_or(0.0, |s| s.transformed_at(ctx.ts, *transform)),
        };
        self.bounds.apply(raw)
    }
}
