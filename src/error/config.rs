//! Configuration validation error types.

use thiserror::Error;

/// Errors raised when a pipeline or retry configuration is invalid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigValidationError {
    /// A numeric field exceeds its allowed maximum.
    #[error("{field} value {value} exceeds maximum {max}")]
    ValueTooHigh {
        /// Name of the offending field.
        field: &'static str,
        /// Configured value.
        value: u64,
        /// Allowed maximum.
        max: u64,
    },

    /// A numeric field is below its allowed minimum.
    #[error("{field} value {value} is below minimum {min}")]
    ValueTooLow {
        /// Name of the offending field.
        field: &'static str,
        /// Configured value.
        value: u64,
        /// Allowed minimum.
        min: u64,
    },
}

impl ConfigValidationError {
    /// Creates a `ValueTooHigh` error.
    pub fn too_high(field: &'static str, value: impl Into<u64>, max: u64) -> Self {
        Self::ValueTooHigh {
            field,
            value: value.into(),
            max,
        }
    }

    /// Creates a `ValueTooLow` error.
    pub fn too_low(field: &'static str, value: impl Into<u64>, min: u64) -> Self {
        Self::ValueTooLow {
            field,
            value: value.into(),
            min,
        }
    }

    /// Returns the name of the field that failed validation.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::ValueTooHigh { field, .. } | Self::ValueTooLow { field, .. } => field,
        }
    }
}

/// Outcome of a successful validation, possibly carrying warnings for
/// suboptimal but valid configurations.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Human-readable warnings.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Creates a validation result with no warnings.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Creates a validation result carrying the given warnings.
    pub fn with_warnings(warnings: Vec<String>) -> Self {
        Self { warnings }
    }
}
