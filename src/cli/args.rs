//! Command-line argument parsing for the cortex-agent CLI.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Ask the agent a question
    Ask(String),
    /// Execute a statement directly
    Sql(String),
    /// Check connectivity to the statement endpoint
    Check,
    /// Show version information
    Version,
    /// Show usage
    Help,
}

/// Parse command-line arguments and return the appropriate command.
///
/// Everything after `ask` or `sql` is joined with spaces, so the query
/// does not need quoting. A subcommand without its argument, or anything
/// unrecognized, yields [`CliCommand::Help`].
///
/// # Examples
///
/// ```
/// use cortex_agent::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["cortex-agent".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    let mut args = args.skip(1);
    let Some(first) = args.next() else {
        return CliCommand::Help;
    };

    let rest = || args.collect::<Vec<_>>().join(" ").trim().to_string();
    match first.as_str() {
        "--version" | "-V" => CliCommand::Version,
        "check" => CliCommand::Check,
        "ask" => match rest() {
            query if query.is_empty() => CliCommand::Help,
            query => CliCommand::Ask(query),
        },
        "sql" => match rest() {
            statement if statement.is_empty() => CliCommand::Help,
            statement => CliCommand::Sql(statement),
        },
        _ => CliCommand::Help,
    }
}

pub const USAGE: &str = "\
Usage: cortex-agent <command>

Commands:
  ask <question>     Ask the agent; any generated SQL is executed
  sql <statement>    Execute a statement directly
  check              Verify the statement endpoint is reachable
  --version, -V      Print version

Environment:
  SNOWFLAKE_ACCOUNT_URL, SNOWFLAKE_PAT (required)
  CORTEX_AGENT_MODEL, CORTEX_SEMANTIC_MODEL_FILE, CORTEX_SEARCH_SERVICE,
  CORTEX_TIMEOUT_SECS, SNOWFLAKE_WAREHOUSE, SNOWFLAKE_DATABASE,
  SNOWFLAKE_SCHEMA, SNOWFLAKE_ROLE (optional)";
