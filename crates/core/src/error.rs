//! Configuration error model.

use thiserror::Error;

/// Result type used when building or validating job configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration-level error.
///
/// The engine treats a [`crate::JobConfig`] as pre-validated; these errors are
/// raised by the launcher boundary before a run starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value was missing or empty.
    #[error("missing configuration value: {0}")]
    Missing(String),

    /// A value was present but outside its allowed range or shape.
    #[error("invalid configuration value: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::Missing(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}
