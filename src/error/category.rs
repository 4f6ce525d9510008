//! Error category classification.
//!
//! Categories drive the propagation policy of an agent call: network and
//! server failures abort the call, configuration failures abort before any
//! request is sent.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection, timeout, or cancellation of an outbound call.
    Network,

    /// The remote endpoint answered with a failure status.
    Server,

    /// Authentication was rejected by the remote endpoint.
    Auth,

    /// Missing or invalid process configuration.
    Configuration,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient.
    ///
    /// The crate itself never retries; callers use this to decide whether
    /// to resubmit a query.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Configuration => "configuration",
        }
    }

    /// Returns suggested recovery actions for this category.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Check network access to the account URL and try again",
            ErrorCategory::Server => "The agent service may be degraded. Please try again later",
            ErrorCategory::Auth => "Check that the programmatic access token is valid",
            ErrorCategory::Configuration => "Check the SNOWFLAKE_* environment settings",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
