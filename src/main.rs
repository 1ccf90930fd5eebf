//! ipmerge - IP blocklist aggregator
//!
//! Merges public IP blocklists into one deduplicated, annotated set.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use ipmerge::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    // Logs go to stderr; stdout carries the rendered list
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run(args) => ipmerge::commands::run::run(args, config_path).await,
        Commands::Replay {
            input,
            filters,
            output,
        } => ipmerge::commands::replay::run(&input, &filters, &output, config_path),
        Commands::Sources => ipmerge::commands::sources::run(),
        Commands::Formats => ipmerge::commands::formats::run(),
        Commands::Version => {
            println!("ipmerge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
