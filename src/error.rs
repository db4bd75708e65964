//! Error types shared across schedule construction and the simulation loop.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Configuration error with field path and constraint description.
///
/// Raised before the simulation starts: unknown distribution kinds, missing
/// parameters, unresolved empirical series, invalid planner settings.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"variables.fuel.gas.regimes[0].dist.kind"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    /// Creates a new error for `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure of a complete simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The scenario could not be turned into schedules and curves.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The solver found no bracket inside the price grid and clamping is disallowed.
    #[error("no equilibrium at {timestamp}: {reason}")]
    EquilibriumNotFound {
        timestamp: NaiveDateTime,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_names_field() {
        let e = ConfigError::new("variables.fuel.gas", "unknown kind \"gamma\"");
        assert_eq!(
            e.to_string(),
            "config error: variables.fuel.gas: unknown kind \"gamma\""
        );
    }

    #[test]
    fn config_error_converts_into_sim_error() {
        let e: SimError = ConfigError::new("market.price_grid", "must not be empty").into();
        assert!(matches!(e, SimError::Configuration(_)));
        assert!(e.to_string().contains("market.price_grid"));
    }
}
