//! File input and output around the simulation core.

pub mod empirical;
pub mod export;

pub use empirical::load_series;
pub use export::{RunMetadata, export_csv, export_metadata, write_csv};
