//! CSV loader for empirical series declared under `[empirical_series]`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::config::ScenarioConfig;
use crate::empirical::{EmpiricalSeries, SeriesMap};
use crate::error::ConfigError;

const TS_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    TS_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Reads one series from CSV with a header row.
///
/// Two or more columns are read as `timestamp,value`; a single column is
/// read as hourly values starting at `start`. Irregular timestamps are
/// resampled to hourly with forward fill.
///
/// # Errors
///
/// Returns a `ConfigError` on `field` for malformed rows or an empty file.
pub fn read_series(
    reader: impl Read,
    start: NaiveDateTime,
    field: &str,
) -> Result<EmpiricalSeries, ConfigError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let width = rdr
        .headers()
        .map_err(|e| ConfigError::new(field, format!("unreadable header: {e}")))?
        .len();

    let mut points = Vec::new();
    let mut values = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row.map_err(|e| ConfigError::new(field, format!("row {}: {e}", i + 1)))?;
        let value_col = if width >= 2 { 1 } else { 0 };
        let value: f64 = row
            .get(value_col)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| ConfigError::new(field, format!("row {}: value is not a number", i + 1)))?;
        if !value.is_finite() {
            return Err(ConfigError::new(field, format!("row {}: value must be finite", i + 1)));
        }
        if width >= 2 {
            let ts = row.get(0).and_then(parse_timestamp).ok_or_else(|| {
                ConfigError::new(field, format!("row {}: unrecognised timestamp", i + 1))
            })?;
            points.push((ts, value));
        } else {
            values.push(value);
        }
    }

    let series = if width >= 2 {
        EmpiricalSeries::from_points(points)
    } else {
        EmpiricalSeries::hourly(start, values)
    };
    series.ok_or_else(|| ConfigError::new(field, "series has no rows"))
}

/// Loads every declared series. Relative paths resolve against `base_dir`.
///
/// # Errors
///
/// Returns the first unreadable or malformed file as a `ConfigError`.
pub fn load_series(cfg: &ScenarioConfig, base_dir: &Path) -> Result<SeriesMap, ConfigError> {
    let mut map = SeriesMap::new();
    for (name, path) in &cfg.empirical_series {
        let field = format!("empirical_series.{name}");
        let full = if path.is_absolute() {
            path.clone()
        } else {
            base_dir.join(path)
        };
        let file = File::open(&full)
            .map_err(|e| ConfigError::new(&field, format!("cannot open \"{}\": {e}", full.display())))?;
        let series = read_series(file, cfg.simulation.start, &field)?;
        info!(series = %name, hours = series.len(), "loaded empirical series");
        map.insert(name.clone(), series);
    }
    Ok(map)
}
