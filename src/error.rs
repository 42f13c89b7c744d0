//! Error types for the metabolic engine.
//!
//! Insufficient or degenerate log data is a normal, representable outcome
//! (confidence tiers, formula fallback, `None` outputs) and never surfaces
//! here. Errors are reserved for genuinely invalid parameters, such as a
//! nonsensical configuration.

use thiserror::Error;

/// Top-level error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// A configuration value is outside its valid range
    #[error("Invalid configuration: {parameter}={value} ({reason})")]
    InvalidConfiguration {
        parameter: String,
        value: String,
        reason: String,
    },

    /// An input value is outside its physiologically plausible range
    #[error("Invalid parameter: {parameter}={value} ({reason})")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub(crate) fn config(parameter: &str, value: impl ToString, reason: &str) -> Self {
        EngineError::InvalidConfiguration {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
