/// Hourly simulation clock.
pub mod clock;
pub mod engine;
/// Post-hoc run statistics.
pub mod summary;
pub mod types;

pub use engine::{Engine, simulate};
pub use summary::RunSummary;
pub use types::{OutputRecord, RegimeLabels, ResolvedValues};
