//! Shared timer facility for time-based bucket rolls.
//!
//! One scheduler serves every bucket writer in the process. Its worker pool is
//! sized by configuration, independent of how many buckets are open. Tasks are
//! one-shot closures that carry all the context they need; the scheduler keeps
//! no per-writer state.
//!
//! Cancellation is best effort. A task whose delay has elapsed may still run
//! after [`RollTaskHandle::cancel`] returns, so tasks must check for
//! themselves whether they are still relevant when they fire.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use drift_core::error::{NoWorkersSnafu, RuntimeBuildSnafu};
use snafu::prelude::*;
use tokio::runtime::{Handle, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;

/// A reference-counted scheduler shared by writers.
pub type RollSchedulerRef = Arc<RollScheduler>;

/// Handle to a scheduled task.
///
/// Cancelling is idempotent and safe at any point: before the task fires,
/// while it runs, or after it finished.
#[derive(Debug, Clone)]
pub struct RollTaskHandle {
    token: CancellationToken,
}

impl RollTaskHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Decrements the in-flight count when a task finishes or is dropped.
struct InFlightGuard {
    count: Arc<AtomicUsize>,
}

impl InFlightGuard {
    fn enter(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::AcqRel);
        Self {
            count: count.clone(),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Runs delayed one-shot tasks on a shared pool.
///
/// Fired tasks execute on the runtime's blocking pool, since they are expected
/// to perform blocking store I/O.
pub struct RollScheduler {
    handle: Handle,
    /// Present when the scheduler owns its runtime.
    runtime: Mutex<Option<Runtime>>,
    shutdown: CancellationToken,
    in_flight: Arc<AtomicUsize>,
}

impl std::fmt::Debug for RollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollScheduler")
            .field("in_flight", &self.in_flight())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl RollScheduler {
    /// Start a scheduler with its own runtime.
    pub fn new(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        ensure!(config.threads > 0, NoWorkersSnafu);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.threads)
            .max_blocking_threads(config.threads)
            .thread_name(config.thread_name.clone())
            .enable_time()
            .build()
            .context(RuntimeBuildSnafu)?;

        info!(
            threads = config.threads,
            thread_name = %config.thread_name,
            "Started rollover scheduler"
        );

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            shutdown: CancellationToken::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Schedule onto an existing runtime instead of owning one.
    ///
    /// The runtime must have the time driver enabled.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            runtime: Mutex::new(None),
            shutdown: CancellationToken::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wrap the scheduler for sharing.
    pub fn shared(self) -> RollSchedulerRef {
        Arc::new(self)
    }

    /// Run `task` once after `delay`, unless cancelled first.
    ///
    /// After [`shutdown`](Self::shutdown) the returned handle is already
    /// cancelled and the task never runs.
    pub fn schedule_once<F>(&self, delay: Duration, task: F) -> RollTaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let token = self.shutdown.child_token();
        let task_handle = RollTaskHandle {
            token: token.clone(),
        };

        if self.shutdown.is_cancelled() {
            debug!("Rollover scheduler is shut down, dropping task");
            return task_handle;
        }

        let guard = InFlightGuard::enter(&self.in_flight);
        self.handle.spawn(async move {
            let _guard = guard;
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!("Scheduled task cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = tokio::task::spawn_blocking(task).await {
                        error!(error = %e, "Scheduled task panicked");
                    }
                }
            }
        });

        task_handle
    }

    /// Tasks scheduled and not yet finished or cancelled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Cancel every pending task and stop the owned runtime.
    ///
    /// Waits up to `timeout` for running tasks. Must not be called from
    /// inside an async context when the scheduler owns its runtime.
    pub fn shutdown(&self, timeout: Duration) {
        self.shutdown.cancel();

        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(runtime) = runtime {
            runtime.shutdown_timeout(timeout);
            info!("Rollover scheduler stopped");
        }
    }
}

impl Drop for RollScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
        let runtime = self
            .runtime
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
    }
}
