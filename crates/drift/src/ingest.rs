//! Line-oriented ingestion loop used by the binary.

use std::io::BufRead;
use std::sync::Arc;

use snafu::ResultExt;
use tracing::{debug, info};

use crate::bucket::BucketWriter;
use crate::counter::{CounterSnapshot, MetricsCounterSink};
use crate::error::{DriftError, InputSnafu};
use crate::event::Event;
use crate::store::BucketStoreRef;
use crate::{Config, RollScheduler};

/// Append every non-empty line of `reader` as one event.
///
/// Returns the number of events appended. Stops at the first error; the
/// writer is left as the error left it.
pub fn ingest_lines<R: BufRead>(reader: R, writer: &BucketWriter) -> Result<u64, DriftError> {
    let mut appended = 0;
    for line in reader.lines() {
        let line = line.context(InputSnafu)?;
        if line.is_empty() {
            continue;
        }
        writer.append(&Event::from(line))?;
        appended += 1;
    }
    debug!(target = %writer.path_prefix(), appended, "Input exhausted");
    Ok(appended)
}

/// Run one writer over `reader` until EOF, then shut everything down.
pub fn run<R: BufRead>(
    config: &Config,
    store: BucketStoreRef,
    reader: R,
) -> Result<CounterSnapshot, DriftError> {
    let scheduler = RollScheduler::new(&config.scheduler)?.shared();
    let counter = Arc::new(MetricsCounterSink::new(config.writer.path_prefix.clone()));

    let writer = BucketWriter::builder(config.writer.clone(), store, scheduler.clone())
        .counter(counter.clone())
        .build()?;

    info!(
        target = %config.writer.path_prefix,
        roll_interval_secs = config.writer.roll_interval_secs,
        roll_size = config.writer.roll_size,
        roll_count = config.writer.roll_count,
        compression = %config.writer.compression,
        "Writing events"
    );

    let ingested = ingest_lines(reader, &writer);
    let shutdown = writer.shutdown();
    drop(writer);
    scheduler.shutdown(config.scheduler.shutdown_timeout());

    ingested?;
    shutdown?;
    Ok(counter.totals())
}
