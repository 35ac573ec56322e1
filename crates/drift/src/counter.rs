//! Counter sinks receiving bucket lifecycle and volume updates.
//!
//! Sinks are fire-and-forget: they never block and never fail back into the
//! writer. Writers call them while holding their own lock, so implementations
//! must not call back into the writer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use drift_core::emit;
use drift_core::metrics::events::{BucketClosed, BucketOpened, BytesWritten, EventsWritten};

/// A reference-counted counter sink.
pub type CounterSinkRef = Arc<dyn CounterSink>;

/// Receives lifecycle and volume updates from a bucket writer.
pub trait CounterSink: Send + Sync {
    fn increment_events_written(&self, count: u64);

    fn add_bytes_written(&self, bytes: u64);

    fn increment_files_opened(&self);

    fn increment_files_closed(&self);

    /// A bucket could not be closed cleanly.
    fn increment_close_failures(&self) {}
}

/// Point-in-time copy of [`SinkCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub events_written: u64,
    pub bytes_written: u64,
    pub files_opened: u64,
    pub files_closed: u64,
    pub close_failures: u64,
}

/// Atomic totals that can be read from any thread while writers update them.
#[derive(Debug, Default)]
pub struct SinkCounters {
    events_written: AtomicU64,
    bytes_written: AtomicU64,
    files_opened: AtomicU64,
    files_closed: AtomicU64,
    close_failures: AtomicU64,
}

impl SinkCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            events_written: self.events_written.load(Ordering::Acquire),
            bytes_written: self.bytes_written.load(Ordering::Acquire),
            files_opened: self.files_opened.load(Ordering::Acquire),
            files_closed: self.files_closed.load(Ordering::Acquire),
            close_failures: self.close_failures.load(Ordering::Acquire),
        }
    }

    pub fn events_written(&self) -> u64 {
        self.events_written.load(Ordering::Acquire)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Acquire)
    }

    pub fn files_opened(&self) -> u64 {
        self.files_opened.load(Ordering::Acquire)
    }

    pub fn files_closed(&self) -> u64 {
        self.files_closed.load(Ordering::Acquire)
    }
}

impl CounterSink for SinkCounters {
    fn increment_events_written(&self, count: u64) {
        self.events_written.fetch_add(count, Ordering::AcqRel);
    }

    fn add_bytes_written(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::AcqRel);
    }

    fn increment_files_opened(&self) {
        self.files_opened.fetch_add(1, Ordering::AcqRel);
    }

    fn increment_files_closed(&self) {
        self.files_closed.fetch_add(1, Ordering::AcqRel);
    }

    fn increment_close_failures(&self) {
        self.close_failures.fetch_add(1, Ordering::AcqRel);
    }
}

/// Forwards updates to the `metrics` facade and keeps local totals.
#[derive(Debug)]
pub struct MetricsCounterSink {
    target: String,
    totals: SinkCounters,
}

impl MetricsCounterSink {
    /// `target` becomes the `target` label on every emitted metric.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            totals: SinkCounters::new(),
        }
    }

    pub fn totals(&self) -> CounterSnapshot {
        self.totals.snapshot()
    }
}

impl CounterSink for MetricsCounterSink {
    fn increment_events_written(&self, count: u64) {
        self.totals.increment_events_written(count);
        emit!(EventsWritten {
            count,
            target: self.target.clone(),
        });
    }

    fn add_bytes_written(&self, bytes: u64) {
        self.totals.add_bytes_written(bytes);
        emit!(BytesWritten {
            bytes,
            target: self.target.clone(),
        });
    }

    fn increment_files_opened(&self) {
        self.totals.increment_files_opened();
        emit!(BucketOpened {
            target: self.target.clone(),
        });
    }

    fn increment_files_closed(&self) {
        self.totals.increment_files_closed();
        emit!(BucketClosed {
            target: self.target.clone(),
        });
    }

    fn increment_close_failures(&self) {
        self.totals.increment_close_failures();
    }
}
