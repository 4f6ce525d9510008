//! Streaming-related error types.
//!
//! These cover failures of the agent's SSE body after the stream has been
//! accepted. Malformed events are never errors; they are skipped by the
//! decoder.

use std::fmt;

/// Stream-specific error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
    /// Stream connection was lost while reading the body.
    ConnectionLost { message: String },

    /// The transport deadline fired before the server closed the stream.
    Timeout { duration_secs: u64 },
}

impl StreamError {
    /// Check if this error is likely transient and can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StreamError::ConnectionLost { .. } | StreamError::Timeout { .. }
        )
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::ConnectionLost { .. } => {
                "Connection to the agent was lost before the answer completed.".to_string()
            }
            StreamError::Timeout { duration_secs } => format!(
                "The agent did not finish answering within {} seconds.",
                duration_secs
            ),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::ConnectionLost { .. } => "E_STREAM_CONN",
            StreamError::Timeout { .. } => "E_STREAM_TIMEOUT",
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::ConnectionLost { message } => {
                write!(f, "Stream connection lost: {}", message)
            }
            StreamError::Timeout { duration_secs } => {
                write!(f, "Stream timeout after {} seconds", duration_secs)
            }
        }
    }
}

impl std::error::Error for StreamError {}
