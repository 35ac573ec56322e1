//! Roll policies and per-bucket statistics.

use std::time::{Duration, Instant};

use drift_core::RollReason;

use crate::config::BucketWriterConfig;

/// Lifecycle state of a bucket writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    /// No bucket open; the next append opens one.
    Idle,
    /// A bucket is open and accepting appends.
    Open,
    /// The open bucket is being synced, closed and finalized.
    Closing,
    /// Shut down; no more appends are accepted.
    Retired,
}

impl BucketState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketState::Idle => "idle",
            BucketState::Open => "open",
            BucketState::Closing => "closing",
            BucketState::Retired => "retired",
        }
    }
}

impl std::fmt::Display for BucketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics for the currently open bucket.
#[derive(Debug, Clone, Copy)]
pub struct BucketStats {
    /// Records appended since open.
    pub events: u64,
    /// Payload bytes appended since open.
    pub bytes: u64,
    pub opened_at: Instant,
    /// Time of the last append, or of the open if nothing was appended.
    pub last_write_at: Instant,
}

impl BucketStats {
    pub fn new(opened_at: Instant) -> Self {
        Self {
            events: 0,
            bytes: 0,
            opened_at,
            last_write_at: opened_at,
        }
    }

    pub fn record_write(&mut self, bytes: u64) {
        self.events += 1;
        self.bytes += bytes;
        self.last_write_at = Instant::now();
    }
}

/// Policy for when to roll a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollPolicy {
    /// Roll once this many records were appended.
    EventCount(u64),
    /// Roll once this many payload bytes were appended.
    ByteSize(u64),
    /// Roll when the bucket has been open this long.
    MaxAge(Duration),
    /// Roll after this long without appends.
    Idle(Duration),
}

impl RollPolicy {
    /// Enabled policies in evaluation order: count, size, age, idle.
    ///
    /// Thresholds of zero are disabled and left out.
    pub fn from_config(config: &BucketWriterConfig) -> Vec<RollPolicy> {
        let mut policies = Vec::with_capacity(4);
        if config.roll_count > 0 {
            policies.push(RollPolicy::EventCount(config.roll_count));
        }
        if config.roll_size > 0 {
            policies.push(RollPolicy::ByteSize(config.roll_size));
        }
        if let Some(interval) = config.roll_interval() {
            policies.push(RollPolicy::MaxAge(interval));
        }
        if let Some(timeout) = config.idle_timeout() {
            policies.push(RollPolicy::Idle(timeout));
        }
        policies
    }

    pub fn reason(&self) -> RollReason {
        match self {
            RollPolicy::EventCount(_) => RollReason::EventCount,
            RollPolicy::ByteSize(_) => RollReason::ByteSize,
            RollPolicy::MaxAge(_) => RollReason::Interval,
            RollPolicy::Idle(_) => RollReason::Idle,
        }
    }

    /// Time-based policies are driven by the rollover scheduler rather than
    /// checked on append.
    pub fn is_scheduled(&self) -> bool {
        self.reason().is_scheduled()
    }

    /// How long until a time-based policy is due. `None` when due now or
    /// when the policy is not time-based.
    pub fn time_remaining(&self, stats: &BucketStats) -> Option<Duration> {
        let (limit, since) = match self {
            RollPolicy::MaxAge(limit) => (limit, stats.opened_at),
            RollPolicy::Idle(limit) => (limit, stats.last_write_at),
            RollPolicy::EventCount(_) | RollPolicy::ByteSize(_) => return None,
        };
        limit
            .checked_sub(since.elapsed())
            .filter(|remaining| !remaining.is_zero())
    }

    /// Check if the bucket should be rolled based on this policy.
    pub fn should_roll(&self, stats: &BucketStats) -> bool {
        match self {
            RollPolicy::EventCount(limit) => stats.events >= *limit,
            RollPolicy::ByteSize(limit) => stats.bytes >= *limit,
            RollPolicy::MaxAge(_) | RollPolicy::Idle(_) => self.time_remaining(stats).is_none(),
        }
    }
}
