//! nab CLI: the `nab` command.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{EnvFilter, fmt};

/// Log filter variable; defaults to `warn`.
const LOG_ENV: &str = "NAB_LOG";

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Query {
            path,
            graph,
            config,
            now,
            json,
        } => commands::query::run(commands::query::Args {
            path,
            graph,
            config,
            now,
            json,
        }),

        Commands::Routes { config, json } => {
            commands::routes::run(commands::routes::Args { config, json })
        }

        Commands::Soul { soul, json } => commands::soul::run(soul, json),
    }
}
