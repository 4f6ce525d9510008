//! Unified error type for agent calls.
//!
//! Only fatal failures reach this type: a stream that could not be opened,
//! a body that broke mid-read, or unusable configuration. Malformed events
//! and statement-execution failures are absorbed into the returned
//! [`AgentResult`](crate::models::AgentResult).

use std::fmt;

use super::category::ErrorCategory;
use super::config::ConfigError;
use super::context::ErrorContext;
use super::network::NetworkError;
use super::stream::StreamError;

/// Unified error type for the crate.
#[derive(Debug)]
pub enum CortexError {
    /// Network-related errors (connections, HTTP, timeouts).
    Network(NetworkError),

    /// Failures of an accepted SSE body.
    Stream(StreamError),

    /// Invalid or missing configuration.
    Config(ConfigError),

    /// Wrapped error with additional context.
    WithContext {
        error: Box<CortexError>,
        context: ErrorContext,
    },
}

impl CortexError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CortexError::Network(NetworkError::HttpStatus { status, .. }) => match *status {
                401 | 403 => ErrorCategory::Auth,
                _ => ErrorCategory::Server,
            },
            CortexError::Network(_) => ErrorCategory::Network,
            CortexError::Stream(_) => ErrorCategory::Network,
            CortexError::Config(_) => ErrorCategory::Configuration,
            CortexError::WithContext { error, .. } => error.category(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            CortexError::Network(err) => err.is_retryable(),
            CortexError::Stream(err) => err.is_retryable(),
            CortexError::Config(_) => false,
            CortexError::WithContext { error, .. } => error.is_retryable(),
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            CortexError::Network(err) => err.user_message(),
            CortexError::Stream(err) => err.user_message(),
            CortexError::Config(err) => format!("Configuration problem: {}", err),
            CortexError::WithContext { error, context } => {
                format!("{}\n\nContext: {}", error.user_message(), context)
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            CortexError::Network(err) => err.error_code(),
            CortexError::Stream(err) => err.error_code(),
            CortexError::Config(err) => err.error_code(),
            CortexError::WithContext { error, .. } => error.error_code(),
        }
    }

    /// Attach context to this error.
    pub fn with_context(self, ctx: ErrorContext) -> Self {
        CortexError::WithContext {
            error: Box::new(self),
            context: ctx,
        }
    }

    /// Get the context if this error has one attached.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            CortexError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Get the inner error without context.
    pub fn inner(&self) -> &CortexError {
        match self {
            CortexError::WithContext { error, .. } => error.inner(),
            _ => self,
        }
    }

    /// Get the recovery hint for this error.
    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }
}

impl fmt::Display for CortexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CortexError::Network(err) => write!(f, "{}", err),
            CortexError::Stream(err) => write!(f, "{}", err),
            CortexError::Config(err) => write!(f, "{}", err),
            CortexError::WithContext { error, context } => {
                write!(f, "{} ({})", error, context)
            }
        }
    }
}

impl std::error::Error for CortexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CortexError::Network(err) => Some(err),
            CortexError::Stream(err) => Some(err),
            CortexError::Config(err) => Some(err),
            CortexError::WithContext { error, .. } => error.source(),
        }
    }
}

impl From<NetworkError> for CortexError {
    fn from(err: NetworkError) -> Self {
        CortexError::Network(err)
    }
}

impl From<StreamError> for CortexError {
    fn from(err: StreamError) -> Self {
        CortexError::Stream(err)
    }
}

impl From<ConfigError> for CortexError {
    fn from(err: ConfigError) -> Self {
        CortexError::Config(err)
    }
}
