//! accessly CLI entrypoint.
//!
//! Thin wrapper: parse args, initialize tracing, dispatch into the
//! library, and exit with the run's status code.

use accessly::cli::{Cli, Command};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present (API key, RUST_LOG overrides)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let Command::Run(args) = cli.command;

    // RUST_LOG wins; otherwise --verbose maps to debug for our crate
    let default_filter = if args.verbose {
        "warn,accessly=debug"
    } else {
        "warn,accessly=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let code = accessly::cli::run(args).await;
    std::process::exit(code);
}
