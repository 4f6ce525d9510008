//! Error handling for agent calls.
//!
//! - **Error Categories**: classification for handling decisions
//! - **Domain-specific Errors**: Network, Stream and Config errors
//! - **Unified Error Type**: `CortexError` consolidates all fatal failures
//! - **Error Context**: operation and correlation id attached to errors
//! - **Result Type Alias**: `CortexResult<T>`
//!
//! | Category | Description | Retryable |
//! |----------|-------------|-----------|
//! | Network | Connection, timeout, cancellation | Yes (not cancellation) |
//! | Server | Non-2xx from the agent endpoint | Yes |
//! | Auth | 401/403 from the agent endpoint | No |
//! | Configuration | Missing account URL or token | No |
//!
//! Statement-execution failures are deliberately absent: they are values
//! inside [`SqlExecutionResult`](crate::models::SqlExecutionResult).

mod category;
mod config;
mod context;
mod cortex_error;
mod network;
mod result;
mod stream;

pub use category::ErrorCategory;
pub use config::ConfigError;
pub use context::ErrorContext;
pub use cortex_error::CortexError;
pub use network::NetworkError;
pub use result::{CortexResult, ResultExt};
pub use stream::StreamError;
