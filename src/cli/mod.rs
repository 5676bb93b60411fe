//! CLI interface using clap
//!
//! Provides the command-line interface for sigharvest

mod commands;

pub use commands::*;

use crate::extract::RecordFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sigharvest - C/C++ function signature harvester
#[derive(Parser, Debug)]
#[command(name = "sigharvest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Extraction settings (TOML)
    #[arg(short, long, global = true, env = "SIGHARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract the unique function records of a corpus
    Extract(ExtractArgs),

    /// Show the records extracted from a single file
    Inspect(InspectArgs),
}

/// Arguments for extract command
#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Root directory; each immediate subdirectory is one work unit
    #[arg(long)]
    pub path_in: PathBuf,

    /// Output file
    #[arg(long)]
    pub file: PathBuf,

    /// Workers per outer context
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub num_threads: u16,

    /// Outer execution contexts
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub num_processes: u16,

    /// Output format
    #[arg(long, value_enum, default_value_t = RecordFormat::Lines)]
    pub format: RecordFormat,
}

/// Arguments for inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// C or C++ source file
    pub target: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = RecordFormat::Lines)]
    pub format: RecordFormat,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
