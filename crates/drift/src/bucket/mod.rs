//! Rolling bucket writer.
//!
//! A [`BucketWriter`] owns one logical output stream and persists it as a
//! sequence of bounded buckets. Buckets roll on whichever enabled policy
//! triggers first:
//!
//! - **event count** and **byte size**, checked after every append. The record
//!   that crosses a threshold is written to the current bucket before it rolls.
//! - **interval**, a maximum bucket age enforced by a task on the shared
//!   [`RollScheduler`](crate::scheduler::RollScheduler) scheduled when the
//!   bucket opens.
//! - **idle timeout**, also scheduled at open and re-armed while appends keep
//!   arriving.
//!
//! Every state transition happens under a single per-writer lock. Each open
//! bumps a generation number and scheduled tasks capture the generation they
//! were scheduled for, so a task that fires after its bucket already rolled
//! finds a different generation (or no open bucket) and does nothing.

mod policy;

pub use policy::{BucketState, BucketStats, RollPolicy};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use drift_core::emit;
use drift_core::metrics::events::{
    BucketCloseCompleted, BucketCloseFailed, BucketRolled, StaleRollSkipped,
};
use drift_core::{ConfigError, FinishedFile, RollReason, StorageError};
use snafu::prelude::*;
use tracing::{debug, error, info, trace, warn};

use crate::config::BucketWriterConfig;
use crate::counter::{CounterSinkRef, MetricsCounterSink};
use crate::error::{
    AppendSnafu, LockPoisonedSnafu, OpenSnafu, RetiredSnafu, SyncSnafu, WriterError,
};
use crate::event::Event;
use crate::formatter::FormatterRef;
use crate::scheduler::{RollSchedulerRef, RollTaskHandle};
use crate::store::{BucketFile, BucketStoreRef};

/// Invoked once for every bucket that was fully closed and finalized.
///
/// Runs on the thread that performed the close, after the writer lock has
/// been released.
pub type CloseCallback = Arc<dyn Fn(&FinishedFile) + Send + Sync>;

/// The currently open bucket and everything tied to its lifetime.
struct OpenBucket {
    file: Box<dyn BucketFile>,
    stats: BucketStats,
    /// Appends since the last sync.
    unsynced: u64,
    roll_task: Option<RollTaskHandle>,
    idle_task: Option<RollTaskHandle>,
}

impl OpenBucket {
    fn cancel_tasks(&mut self) {
        if let Some(task) = self.roll_task.take() {
            task.cancel();
        }
        if let Some(task) = self.idle_task.take() {
            task.cancel();
        }
    }
}

struct WriterInner {
    state: BucketState,
    /// Incremented on every successful open.
    generation: u64,
    /// `Some` while `state` is `Open`.
    bucket: Option<OpenBucket>,
}

/// Writes events into a rolling sequence of buckets.
///
/// Safe to share between threads; appends from different threads are
/// serialized. Create one with [`BucketWriter::builder`].
pub struct BucketWriter {
    config: BucketWriterConfig,
    policies: Vec<RollPolicy>,
    inner: Mutex<WriterInner>,
    store: BucketStoreRef,
    formatter: FormatterRef,
    counter: CounterSinkRef,
    scheduler: RollSchedulerRef,
    on_close: Option<CloseCallback>,
    /// Handed to scheduled tasks so they never keep the writer alive.
    this: Weak<BucketWriter>,
}

impl std::fmt::Debug for BucketWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketWriter")
            .field("path_prefix", &self.config.path_prefix)
            .field("store", &self.store.name())
            .field("formatter", &self.formatter.name())
            .field("state", &self.state())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Builder for [`BucketWriter`].
pub struct BucketWriterBuilder {
    config: BucketWriterConfig,
    store: BucketStoreRef,
    scheduler: RollSchedulerRef,
    formatter: Option<FormatterRef>,
    counter: Option<CounterSinkRef>,
    on_close: Option<CloseCallback>,
}

impl BucketWriterBuilder {
    /// Override the formatter selected by `config.format`.
    pub fn formatter(mut self, formatter: FormatterRef) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Defaults to a [`MetricsCounterSink`] labelled with the path prefix.
    pub fn counter(mut self, counter: CounterSinkRef) -> Self {
        self.counter = Some(counter);
        self
    }

    pub fn on_close(mut self, callback: CloseCallback) -> Self {
        self.on_close = Some(callback);
        self
    }

    pub fn build(self) -> Result<Arc<BucketWriter>, ConfigError> {
        self.config.validate()?;

        let formatter = self
            .formatter
            .unwrap_or_else(|| self.config.format.build());
        let counter = self
            .counter
            .unwrap_or_else(|| Arc::new(MetricsCounterSink::new(self.config.path_prefix.clone())));
        let policies = RollPolicy::from_config(&self.config);

        debug!(
            target = %self.config.path_prefix,
            store = self.store.name(),
            formatter = formatter.name(),
            policies = ?policies,
            "Created bucket writer"
        );

        Ok(Arc::new_cyclic(|this| BucketWriter {
            config: self.config,
            policies,
            inner: Mutex::new(WriterInner {
                state: BucketState::Idle,
                generation: 0,
                bucket: None,
            }),
            store: self.store,
            formatter,
            counter,
            scheduler: self.scheduler,
            on_close: self.on_close,
            this: this.clone(),
        }))
    }
}

impl BucketWriter {
    pub fn builder(
        config: BucketWriterConfig,
        store: BucketStoreRef,
        scheduler: RollSchedulerRef,
    ) -> BucketWriterBuilder {
        BucketWriterBuilder {
            config,
            store,
            scheduler,
            formatter: None,
            counter: None,
            on_close: None,
        }
    }

    pub fn config(&self) -> &BucketWriterConfig {
        &self.config
    }

    pub fn path_prefix(&self) -> &str {
        &self.config.path_prefix
    }

    pub fn state(&self) -> BucketState {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    /// Number of buckets opened so far.
    pub fn generation(&self) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    pub fn is_open(&self) -> bool {
        self.state() == BucketState::Open
    }

    /// Append one event, opening a bucket first if none is open.
    ///
    /// If the append reaches the count or size threshold, the bucket is
    /// closed before this returns. A failed append leaves the bucket open.
    /// A failed batch sync is returned after the threshold check, so a due
    /// roll still happens.
    pub fn append(&self, event: &Event) -> Result<(), WriterError> {
        let payload = self.formatter.format(event);

        let (synced, closed) = {
            let mut inner = self.lock()?;
            ensure!(
                inner.state != BucketState::Retired,
                RetiredSnafu {
                    path_prefix: &self.config.path_prefix
                }
            );

            let mut bucket = match inner.bucket.take() {
                Some(bucket) => bucket,
                None => self.open_locked(&mut inner)?,
            };

            if let Err(e) = self.write_locked(&mut bucket, &payload) {
                inner.bucket = Some(bucket);
                return Err(e);
            }
            let synced = self.batch_sync_locked(&mut bucket);

            let closed = match self.threshold_reached(&bucket.stats) {
                Some(reason) => Some(self.close_locked(&mut inner, bucket, reason)),
                None => {
                    inner.bucket = Some(bucket);
                    None
                }
            };
            (synced, closed)
        };

        if let Some(finished) = closed.transpose()? {
            self.notify_closed(&finished);
        }
        synced
    }

    /// Sync the open bucket to the store without closing it.
    pub fn flush(&self) -> Result<(), WriterError> {
        let mut inner = self.lock()?;
        if let Some(bucket) = inner.bucket.as_mut() {
            bucket
                .file
                .sync()
                .context(SyncSnafu {
                    path: bucket.file.path(),
                })?;
            bucket.unsynced = 0;
        }
        Ok(())
    }

    /// Close the open bucket now.
    ///
    /// Returns `None` when no bucket was open, so closing twice closes once.
    pub fn close(&self) -> Result<Option<FinishedFile>, WriterError> {
        let finished = {
            let mut inner = self.lock()?;
            match inner.bucket.take() {
                Some(bucket) => Some(self.close_locked(&mut inner, bucket, RollReason::Forced)?),
                None => None,
            }
        };

        if let Some(finished) = &finished {
            self.notify_closed(finished);
        }
        Ok(finished)
    }

    /// Close the open bucket and stop accepting events.
    ///
    /// Idempotent. The writer is retired even if the final close fails.
    pub fn shutdown(&self) -> Result<Option<FinishedFile>, WriterError> {
        let finished = {
            let mut inner = self.lock()?;
            if inner.state == BucketState::Retired {
                return Ok(None);
            }

            let result = match inner.bucket.take() {
                Some(bucket) => self
                    .close_locked(&mut inner, bucket, RollReason::Shutdown)
                    .map(Some),
                None => Ok(None),
            };
            inner.state = BucketState::Retired;

            info!(
                target = %self.config.path_prefix,
                generation = inner.generation,
                "Bucket writer shut down"
            );
            result?
        };

        if let Some(finished) = &finished {
            self.notify_closed(finished);
        }
        Ok(finished)
    }

    fn lock(&self) -> Result<MutexGuard<'_, WriterInner>, WriterError> {
        self.inner.lock().map_err(|_| {
            LockPoisonedSnafu {
                path_prefix: &self.config.path_prefix,
            }
            .build()
        })
    }

    /// Open a new bucket and schedule its time-based rolls.
    ///
    /// On failure nothing changes: the writer stays idle and no counters move.
    fn open_locked(&self, inner: &mut WriterInner) -> Result<OpenBucket, WriterError> {
        let file = self
            .store
            .open(
                &self.config.path_prefix,
                self.config.suffix.as_deref(),
                self.config.compression,
            )
            .context(OpenSnafu {
                path_prefix: &self.config.path_prefix,
            })?;

        inner.generation += 1;
        inner.state = BucketState::Open;
        let generation = inner.generation;

        let roll_task = self
            .config
            .roll_interval()
            .map(|interval| self.schedule_roll(generation, RollReason::Interval, interval));
        let idle_task = self
            .config
            .idle_timeout()
            .map(|timeout| self.schedule_roll(generation, RollReason::Idle, timeout));

        self.counter.increment_files_opened();
        info!(
            target = %self.config.path_prefix,
            generation,
            path = file.path(),
            "Opened bucket"
        );

        Ok(OpenBucket {
            file,
            stats: BucketStats::new(Instant::now()),
            unsynced: 0,
            roll_task,
            idle_task,
        })
    }

    fn write_locked(&self, bucket: &mut OpenBucket, payload: &[u8]) -> Result<(), WriterError> {
        bucket.file.append(payload).context(AppendSnafu {
            path: bucket.file.path(),
        })?;

        let len = payload.len() as u64;
        bucket.stats.record_write(len);
        self.counter.increment_events_written(1);
        self.counter.add_bytes_written(len);
        Ok(())
    }

    /// Sync every `batch_size` appends.
    fn batch_sync_locked(&self, bucket: &mut OpenBucket) -> Result<(), WriterError> {
        if self.config.batch_size == 0 {
            return Ok(());
        }
        bucket.unsynced += 1;
        if bucket.unsynced < self.config.batch_size {
            return Ok(());
        }

        bucket.unsynced = 0;
        trace!(target = %self.config.path_prefix, path = bucket.file.path(), "Batch sync");
        bucket.file.sync().context(SyncSnafu {
            path: bucket.file.path(),
        })
    }

    /// First append-time policy that is due, in configured order.
    fn threshold_reached(&self, stats: &BucketStats) -> Option<RollReason> {
        self.policies
            .iter()
            .filter(|policy| !policy.is_scheduled())
            .find(|policy| policy.should_roll(stats))
            .map(RollPolicy::reason)
    }

    /// Sync, close and finalize `bucket`, leaving the writer idle.
    ///
    /// The writer goes back to idle whether or not the store calls succeed.
    fn close_locked(
        &self,
        inner: &mut WriterInner,
        mut bucket: OpenBucket,
        reason: RollReason,
    ) -> Result<FinishedFile, WriterError> {
        inner.state = BucketState::Closing;
        bucket.cancel_tasks();

        let start = Instant::now();
        let path = bucket.file.path().to_string();
        let result = finish(bucket.file);
        inner.state = BucketState::Idle;

        match result {
            Ok(finished) => {
                self.counter.increment_files_closed();
                emit!(BucketRolled {
                    reason,
                    target: self.config.path_prefix.clone(),
                });
                emit!(BucketCloseCompleted {
                    duration: start.elapsed(),
                    target: self.config.path_prefix.clone(),
                });
                info!(
                    target = %self.config.path_prefix,
                    generation = inner.generation,
                    %reason,
                    path = %finished.path,
                    records = finished.record_count,
                    bytes = finished.payload_bytes,
                    size = finished.size,
                    "Closed bucket"
                );
                Ok(finished)
            }
            Err(source) => {
                self.counter.increment_close_failures();
                emit!(BucketCloseFailed {
                    reason,
                    target: self.config.path_prefix.clone(),
                });
                Err(WriterError::Close {
                    path,
                    reason,
                    source,
                })
            }
        }
    }

    fn schedule_roll(&self, generation: u64, reason: RollReason, delay: Duration) -> RollTaskHandle {
        let writer = self.this.clone();
        self.scheduler.schedule_once(delay, move || {
            if let Some(writer) = writer.upgrade() {
                writer.on_scheduled_roll(generation, reason);
            }
        })
    }

    /// Entry point for fired interval and idle tasks.
    ///
    /// A task scheduled for an older generation, or one that fires while no
    /// bucket is open, does nothing. Failures are logged since there is no
    /// caller to return them to.
    fn on_scheduled_roll(&self, generation: u64, reason: RollReason) {
        let result = {
            let mut inner = match self.lock() {
                Ok(inner) => inner,
                Err(e) => {
                    error!(target = %self.config.path_prefix, error = %e, %reason, "Scheduled roll failed");
                    return;
                }
            };

            if inner.state != BucketState::Open || inner.generation != generation {
                debug!(
                    target = %self.config.path_prefix,
                    scheduled_generation = generation,
                    current_generation = inner.generation,
                    state = %inner.state,
                    %reason,
                    "Skipping stale roll"
                );
                emit!(StaleRollSkipped {
                    reason,
                    target: self.config.path_prefix.clone(),
                });
                return;
            }
            let Some(mut bucket) = inner.bucket.take() else {
                return;
            };

            let remaining = self
                .policies
                .iter()
                .find(|policy| policy.reason() == reason)
                .and_then(|policy| policy.time_remaining(&bucket.stats));
            if let Some(remaining) = remaining {
                trace!(
                    target = %self.config.path_prefix,
                    generation,
                    %reason,
                    remaining_ms = remaining.as_millis() as u64,
                    "Roll not yet due, re-arming"
                );
                let task = self.schedule_roll(generation, reason, remaining);
                match reason {
                    RollReason::Idle => bucket.idle_task = Some(task),
                    _ => bucket.roll_task = Some(task),
                }
                inner.bucket = Some(bucket);
                return;
            }

            self.close_locked(&mut inner, bucket, reason)
        };

        match result {
            Ok(finished) => self.notify_closed(&finished),
            Err(e) => error!(
                target = %self.config.path_prefix,
                error = %e,
                %reason,
                "Scheduled bucket close failed"
            ),
        }
    }

    fn notify_closed(&self, finished: &FinishedFile) {
        if let Some(callback) = &self.on_close {
            callback(finished);
        }
    }
}

/// Store-side close sequence: sync, close, finalize.
fn finish(mut file: Box<dyn BucketFile>) -> Result<FinishedFile, StorageError> {
    file.sync()?;
    file.close()?;
    file.finalize()
}

impl Drop for BucketWriter {
    fn drop(&mut self) {
        if self.is_open() {
            warn!(
                target = %self.config.path_prefix,
                "Bucket writer dropped with an open bucket, closing it"
            );
        }
        if let Err(e) = self.shutdown() {
            error!(target = %self.config.path_prefix, error = %e, "Final bucket close failed");
        }
    }
}
