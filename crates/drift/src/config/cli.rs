//! Command-line arguments for the drift binary.

use std::path::PathBuf;

use clap::Parser;

/// Append newline-delimited records from a file or stdin into rolling buckets.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct CliArgs {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Read records from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}
