//! Configuration error types.

use thiserror::Error;

/// Errors raised while assembling an [`AgentConfig`](crate::config::AgentConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    /// A setting is present but unusable.
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::MissingVar(_) => "E_CFG_MISSING",
            ConfigError::Invalid { .. } => "E_CFG_INVALID",
        }
    }
}
