//! cortex-agent - client for the Snowflake Cortex agent API
//!
//! Sends a natural-language question to the agent endpoint, decodes the
//! server-sent event stream into text, citations and SQL, and executes the
//! generated SQL through the statements endpoint.
//!
//! ```ignore
//! use cortex_agent::{agent::AgentOrchestrator, config::AgentConfig};
//!
//! let agent = AgentOrchestrator::new(AgentConfig::from_env()?);
//! let result = agent.run_agent_query("Which region grew fastest?").await?;
//! ```

pub mod adapters;
pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod models;
pub mod sse;
pub mod traits;

pub use agent::AgentOrchestrator;
pub use config::AgentConfig;
pub use error::{CortexError, CortexResult};
pub use models::{AgentResult, Citation, SqlExecutionResult};
