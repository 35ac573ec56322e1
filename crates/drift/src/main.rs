//! Drift CLI: append newline-delimited records into rolling buckets.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use drift::ingest::run;
use drift::{CliArgs, Config, LocalBucketStore, init_tracing};

fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match Config::from_path(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                eprintln!("Failed to open {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(io::stdin().lock()),
    };

    info!(
        "Starting drift with prefix {} ({} scheduler thread(s))",
        config.writer.path_prefix, config.scheduler.threads
    );

    match run(&config, Arc::new(LocalBucketStore::new()), reader) {
        Ok(totals) => {
            info!(
                events = totals.events_written,
                bytes = totals.bytes_written,
                files_opened = totals.files_opened,
                files_closed = totals.files_closed,
                "Drift finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Drift failed: {e}");
            ExitCode::FAILURE
        }
    }
}
