//! sigharvest - C/C++ function signature harvester
//!
//! Walks a corpus of source folders in parallel and writes the set of unique
//! top-level function records it finds.

use anyhow::Result;
use sigharvest::cli::{extract, inspect, Cli, Commands};
use sigharvest::ExtractConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Configuration errors abort before any work starts
    let config = ExtractConfig::load_or_default(cli.config.as_deref())?;

    // Execute command
    match cli.command {
        Commands::Extract(args) => {
            extract(
                config,
                &args.path_in,
                &args.file,
                usize::from(args.num_threads),
                usize::from(args.num_processes),
                args.format,
            )?;
        }

        Commands::Inspect(args) => {
            inspect(config, &args.target, args.format)?;
        }
    }

    Ok(())
}
