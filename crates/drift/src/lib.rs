//! Drift: rolling bucket writer for event-ingestion pipelines.
//!
//! This crate handles:
//! - Appending records to a sequence of bounded output files ("buckets")
//! - Rolling buckets by event count, byte size, age and idle time
//! - A shared rollover scheduler for the time-based rolls
//! - Local filesystem and in-memory bucket stores, with optional compression

pub mod bucket;
pub mod config;
pub mod counter;
pub mod error;
pub mod event;
pub mod formatter;
pub mod ingest;
pub mod scheduler;
pub mod store;

// Re-export commonly used items
pub use bucket::{BucketState, BucketWriter, BucketWriterBuilder, CloseCallback, RollPolicy};
pub use config::{BucketWriterConfig, CliArgs, Config, SchedulerConfig};
pub use counter::{CounterSink, CounterSinkRef, CounterSnapshot, MetricsCounterSink, SinkCounters};
pub use error::{DriftError, WriterError};
pub use event::Event;
pub use formatter::{FormatKind, Formatter, FormatterRef, JsonFormatter, TextFormatter};
pub use scheduler::{RollScheduler, RollSchedulerRef, RollTaskHandle};
pub use store::{
    BucketFile, BucketStore, BucketStoreRef, LocalBucketStore, MemoryBucketStore, MemoryObject,
};

// Re-export from drift-core
pub use drift_core::{CompressionKind, FinishedFile, RollReason, init_tracing};
