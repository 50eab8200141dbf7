//! Error types for gcsim-telemetry.

use thiserror::Error;

/// Errors raised when configuring telemetry generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    /// A probability or coefficient outside `[0, 1]`.
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfUnitRange {
        /// Parameter name.
        name: &'static str,
        /// Supplied value.
        value: f64,
    },
}

/// Check that `value` lies in `[0, 1]`.
pub fn check_unit(name: &'static str, value: f64) -> Result<f64, TelemetryError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(TelemetryError::OutOfUnitRange { name, value })
    }
}
