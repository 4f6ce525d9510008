use color_eyre::Result;
use cortex_agent::cli::{parse_args, run_cli_command};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "cortex_agent=info";

fn init_tracing() {
    // Logs go to stderr so stdout stays clean JSON.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(false),
        )
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv::dotenv().ok();
    init_tracing();

    let command = parse_args(std::env::args());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_cli_command(command))
}
