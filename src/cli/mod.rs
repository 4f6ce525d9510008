//! CLI front end.
//!
//! ```ignore
//! use cortex_agent::cli::{parse_args, run_cli_command};
//!
//! let command = parse_args(std::env::args());
//! runtime.block_on(run_cli_command(command))?;
//! ```

pub mod args;
pub mod version;

pub use args::{parse_args, CliCommand, USAGE};
pub use version::{version_line, VERSION};

use color_eyre::eyre::{bail, Report, WrapErr};
use color_eyre::{Result, Section};
use serde::Serialize;

use crate::agent::AgentOrchestrator;
use crate::config::AgentConfig;

/// Run a parsed command to completion, printing results to stdout.
pub async fn run_cli_command(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Version => {
            println!("{}", version_line());
            Ok(())
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        CliCommand::Ask(query) => {
            let agent = orchestrator_from_env()?;
            match agent.run_agent_query_with_cancel(&query, interrupted()).await {
                Ok(result) => print_json(&result),
                Err(err) => {
                    if let Some(context) = err.context() {
                        tracing::error!(code = err.error_code(), "{}", context.to_log_string());
                    }
                    let hint = err.recovery_hint();
                    Err(Report::new(err).suggestion(hint))
                }
            }
        }
        CliCommand::Sql(statement) => {
            let agent = orchestrator_from_env()?;
            let outcome = agent.run_sql(&statement).await;
            print_json(&outcome)?;
            if !outcome.is_success() {
                bail!("statement failed");
            }
            Ok(())
        }
        CliCommand::Check => {
            let agent = orchestrator_from_env()?;
            if !agent.health_check().await {
                bail!("statement endpoint at {} is not reachable", agent.config().base_url);
            }
            println!("ok: {}", agent.config().base_url);
            Ok(())
        }
    }
}

fn orchestrator_from_env() -> Result<AgentOrchestrator> {
    let config = AgentConfig::from_env().wrap_err("Failed to load configuration")?;
    tracing::debug!(config = ?config, "Loaded configuration");
    Ok(AgentOrchestrator::new(config))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the signal handler cannot be
/// installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Ctrl-C handler unavailable");
        std::future::pending::<()>().await;
    }
}
