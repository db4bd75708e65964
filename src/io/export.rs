//! CSV export of output records plus a JSON metadata sidecar.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::equilibrium::ClearingStatus;
use crate::sim::types::OutputRecord;
use crate::supply::Technology;

/// Timestamp format used in the `timestamp` column.
const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Builds the header: fixed columns, per-technology dispatch and
/// availability, sorted value columns, sorted `<var>_regime` columns.
///
/// Variable columns are the union over all records so a stray missing key
/// never shifts the layout.
fn columns(records: &[OutputRecord]) -> (Vec<String>, Vec<String>, Vec<String>) {
    let values: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.values.keys().map(String::as_str))
        .collect();
    let regimes: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.regimes.keys().map(String::as_str))
        .collect();

    let mut header: Vec<String> = ["timestamp", "price", "quantity", "status"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    header.extend(Technology::ALL.iter().map(|t| format!("dispatch_{t}")));
    header.extend(Technology::ALL.iter().map(|t| format!("available_{t}")));
    header.extend(values.iter().map(|v| (*v).to_string()));
    header.extend(regimes.iter().map(|v| format!("{v}_regime")));

    (
        header,
        values.into_iter().map(str::to_string).collect(),
        regimes.into_iter().map(str::to_string).collect(),
    )
}

/// Exports records to a CSV file at `path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[OutputRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(records, io::BufWriter::new(file))
}

/// Writes records as CSV to any writer. Output is deterministic for
/// identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(records: &[OutputRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    let (header, values, regimes) = columns(records);
    wtr.write_record(&header)?;

    for r in records {
        let mut row = Vec::with_capacity(header.len());
        row.push(r.timestamp.format(TS_FORMAT).to_string());
        row.push(format!("{:.4}", r.price));
        row.push(format!("{:.4}", r.quantity));
        row.push(r.status.as_str().to_string());
        for tech in Technology::ALL {
            row.push(format!("{:.4}", r.dispatch_of(tech)));
        }
        for tech in Technology::ALL {
            row.push(format!("{:.4}", r.available.get(&tech).copied().unwrap_or(0.0)));
        }
        for v in &values {
            row.push(r.values.get(v).map(|x| format!("{x:.6}")).unwrap_or_default());
        }
        for v in &regimes {
            row.push(r.regimes.get(v).cloned().unwrap_or_default());
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Run-level facts written next to the CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub seed: u64,
    pub start: NaiveDateTime,
    pub hours: usize,
    pub clamped_low: usize,
    pub clamped_high: usize,
    /// Preset name or scenario file the run came from, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
}

impl RunMetadata {
    pub fn from_records(seed: u64, start: NaiveDateTime, records: &[OutputRecord]) -> Self {
        let count = |s: ClearingStatus| records.iter().filter(|r| r.status == s).count();
        Self {
            seed,
            start,
            hours: records.len(),
            clamped_low: count(ClearingStatus::ClampedLow),
            clamped_high: count(ClearingStatus::ClampedHigh),
            scenario: None,
        }
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }
}

/// Sidecar path for a CSV: `out.csv` becomes `out.meta.json`.
pub fn metadata_path(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("meta.json")
}

/// Writes pretty-printed JSON metadata to `writer`.
///
/// # Errors
///
/// Returns an `io::Error` if serialization or writing fails.
pub fn write_metadata(meta: &RunMetadata, mut writer: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, meta)?;
    writeln!(writer)?;
    Ok(())
}

/// Writes the metadata sidecar file for `csv_path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_metadata(meta: &RunMetadata, csv_path: &Path) -> io::Result<PathBuf> {
    let path = metadata_path(csv_path);
    let file = File::create(&path)?;
    write_metadata(meta, io::BufWriter::new(file))?;
    Ok(path)
}
