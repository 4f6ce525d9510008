//! Result type alias for agent operations.

use super::context::ErrorContext;
use super::cortex_error::CortexError;

/// Type alias for Results using CortexError.
pub type CortexResult<T> = Result<T, CortexError>;

/// Extension trait for Result types to add context to errors.
pub trait ResultExt<T> {
    /// Add context to an error if the result is Err.
    fn context(self, ctx: ErrorContext) -> CortexResult<T>;

    /// Add context using a closure (only called on error).
    fn with_context<F>(self, f: F) -> CortexResult<T>
    where
        F: FnOnce() -> ErrorContext;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<CortexError>,
{
    fn context(self, ctx: ErrorContext) -> CortexResult<T> {
        self.map_err(|e| e.into().with_context(ctx))
    }

    fn with_context<F>(self, f: F) -> CortexResult<T>
    where
        F: FnOnce() -> ErrorContext,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
