//! Internal events for drift metrics emission.
//!
//! Every event carries a `target` label holding the bucket path prefix, so
//! writers sharing a process can be told apart.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Records appended to a bucket.
pub struct EventsWritten {
    pub count: u64,
    pub target: String,
}

impl InternalEvent for EventsWritten {
    fn emit(self) {
        trace!(count = self.count, target = %self.target, "Events written");
        counter!("drift_events_written_total", "target" => self.target).increment(self.count);
    }
}

/// Formatted payload bytes appended to a bucket.
pub struct BytesWritten {
    pub bytes: u64,
    pub target: String,
}

impl InternalEvent for BytesWritten {
    fn emit(self) {
        trace!(bytes = self.bytes, target = %self.target, "Bytes written");
        counter!("drift_bytes_written_total", "target" => self.target).increment(self.bytes);
    }
}

/// A bucket was opened.
pub struct BucketOpened {
    pub target: String,
}

impl InternalEvent for BucketOpened {
    fn emit(self) {
        trace!(target = %self.target, "Bucket opened");
        counter!("drift_buckets_opened_total", "target" => self.target).increment(1);
    }
}

/// A bucket was closed and finalized.
pub struct BucketClosed {
    pub target: String,
}

impl InternalEvent for BucketClosed {
    fn emit(self) {
        trace!(target = %self.target, "Bucket closed");
        counter!("drift_buckets_closed_total", "target" => self.target).increment(1);
    }
}

/// Why a bucket was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollReason {
    /// Event count reached `roll_count`.
    EventCount,
    /// Payload bytes reached `roll_size`.
    ByteSize,
    /// The bucket reached its maximum age.
    Interval,
    /// No append happened within the idle timeout.
    Idle,
    /// Closed on request by the owner.
    Forced,
    /// Final close when the writer is retired.
    Shutdown,
}

impl RollReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollReason::EventCount => "count",
            RollReason::ByteSize => "size",
            RollReason::Interval => "interval",
            RollReason::Idle => "idle",
            RollReason::Forced => "forced",
            RollReason::Shutdown => "shutdown",
        }
    }

    /// Whether the close was requested by the rollover scheduler.
    pub fn is_scheduled(&self) -> bool {
        matches!(self, RollReason::Interval | RollReason::Idle)
    }
}

impl std::fmt::Display for RollReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bucket was rolled, labelled with the trigger.
pub struct BucketRolled {
    pub reason: RollReason,
    pub target: String,
}

impl InternalEvent for BucketRolled {
    fn emit(self) {
        trace!(reason = self.reason.as_str(), target = %self.target, "Bucket rolled");
        counter!("drift_bucket_rolls_total", "reason" => self.reason.as_str(), "target" => self.target)
            .increment(1);
    }
}

/// Closing a bucket failed.
pub struct BucketCloseFailed {
    pub reason: RollReason,
    pub target: String,
}

impl InternalEvent for BucketCloseFailed {
    fn emit(self) {
        trace!(reason = self.reason.as_str(), target = %self.target, "Bucket close failed");
        counter!("drift_bucket_close_failures_total", "reason" => self.reason.as_str(), "target" => self.target)
            .increment(1);
    }
}

/// A scheduled roll fired for a bucket that was already closed or replaced.
pub struct StaleRollSkipped {
    pub reason: RollReason,
    pub target: String,
}

impl InternalEvent for StaleRollSkipped {
    fn emit(self) {
        trace!(reason = self.reason.as_str(), target = %self.target, "Stale roll skipped");
        counter!("drift_stale_rolls_skipped_total", "reason" => self.reason.as_str(), "target" => self.target)
            .increment(1);
    }
}

// ============================================================================
// Histogram events for timing
// ============================================================================

/// Time spent in the sync, close and finalize sequence of one bucket.
pub struct BucketCloseCompleted {
    pub duration: Duration,
    pub target: String,
}

impl InternalEvent for BucketCloseCompleted {
    fn emit(self) {
        trace!(
            duration_ms = self.duration.as_millis(),
            target = %self.target,
            "Bucket close completed"
        );
        histogram!("drift_bucket_close_duration_seconds", "target" => self.target)
            .record(self.duration.as_secs_f64());
    }
}
