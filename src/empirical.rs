//! Hourly empirical series consumed by `empirical` distributions.
//!
//! Series are resampled to an hourly grid with forward fill once, before the
//! simulation starts. Lookups in the hot loop are index arithmetic only.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta, Timelike};

/// Named series available to the sampler.
pub type SeriesMap = BTreeMap<String, EmpiricalSeries>;

/// How a raw series value is turned into a sampled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    /// The raw value at the timestamp.
    #[default]
    Level,
    /// `value / previous_hour - 1`, or 0 when the previous hour is 0.
    PctChange,
    /// `value - previous_hour`.
    Diff,
}

impl Transform {
    /// Parses a transform name as written in scenario files.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "level" => Some(Self::Level),
            "pct_change" | "percent_change" => Some(Self::PctChange),
            "diff" | "difference" => Some(Self::Diff),
            _ => None,
        }
    }
}

/// A gap-free hourly series starting at `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalSeries {
    start: NaiveDateTime,
    values: Vec<f64>,
}

impl EmpiricalSeries {
    /// Wraps already-hourly values. Returns `None` for an empty series.
    pub fn hourly(start: NaiveDateTime, values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            start: floor_hour(start),
            values,
        })
    }

    /// Resamples irregular points onto an hourly grid with forward fill.
    ///
    /// Points are sorted first; when several points fall into the same hour
    /// the latest one wins. Returns `None` if `points` is empty.
    pub fn from_points(mut points: Vec<(NaiveDateTime, f64)>) -> Option<Self> {
        points.sort_by_key(|(ts, _)| *ts);
        let first = floor_hour(points.first()?.0);
        let last = floor_hour(points.last()?.0);
        let len = (last - first).num_hours() as usize + 1;

        let mut values = Vec::with_capacity(len);
        let mut cursor = 0;
        let mut current = points[0].1;
        for h in 0..len {
            let slot = first + TimeDelta::hours(h as i64);
            while cursor < points.len() && floor_hour(points[cursor].0) <= slot {
                current = points[cursor].1;
                cursor += 1;
            }
            values.push(current);
        }

        Some(Self {
            start: first,
            values,
        })
    }

    /// First timestamp covered by the series.
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Number of hourly values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`; empty series cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at `ts`, padding with the nearest edge value outside the range.
    pub fn value_at(&self, ts: NaiveDateTime) -> f64 {
        let offset = (floor_hour(ts) - self.start).num_hours();
        let idx = offset.clamp(0, self.values.len() as i64 - 1) as usize;
        self.values[idx]
    }

    /// Transformed value at `ts`, compared against the prior hour of the raw series.
    pub fn transformed_at(&self, ts: NaiveDateTime, transform: Transform) -> f64 {
        let value = self.value_at(ts);
        match transform {
            Transform::Level => value,
            Transform::PctChange => {
                let prev = self.value_at(ts - TimeDelta::hours(1));
                if prev == 0.0 { 0.0 } else { value / prev - 1.0 }
            }
            Transform::Diff => value - self.value_at(ts - TimeDelta::hours(1)),
        }
    }
}

fn floor_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}
