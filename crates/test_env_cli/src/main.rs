use clap::{Parser, Subcommand};
use test_env_cli::commands;
use test_env_cli::config::AppConfig;
use test_env_cli::errors::{Error, EXIT_SUCCESS};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Environment variable holding the log filter, e.g. `debug` or `test_env_core=trace`.
const LOG_FILTER_VAR: &str = "TEST_ENV_LOG";

/// test-env: Manage ephemeral test environment containers
#[derive(Parser)]
#[command(name = "test-env", version)]
#[command(about = "Create and delete ephemeral test environment containers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a container and wait until it is ready for use
    Create,

    /// Delete a container
    Delete {
        /// ID of the container to delete
        container_id: String,
    },
}

async fn run(command: &Commands) -> Result<(), Error> {
    let config = AppConfig::from_env()?;
    match command {
        Commands::Create => commands::create(&config).await.map(|_| ()),
        Commands::Delete { container_id } => commands::delete(&config, container_id).await,
    }
}

fn init_logging() {
    // Diagnostics go to stderr; stdout only carries the container outputs
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();

    // Usage errors exit with status 2 from inside clap
    let cli = Cli::parse();
    match run(&cli.command).await {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(e) => {
            let container_id = match &e {
                Error::Lifecycle(lifecycle) => lifecycle.container_id(),
                _ => None,
            };
            error!(container_id = ?container_id, "Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
