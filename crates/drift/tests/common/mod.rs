//! Shared helpers for bucket writer integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use drift::{
    BucketFile, BucketStore, BucketWriter, BucketWriterConfig, CompressionKind, FinishedFile,
    MemoryBucketStore, RollScheduler, RollSchedulerRef, SchedulerConfig, SinkCounters,
};
use drift_core::StorageError;

/// Which store calls currently fail.
#[derive(Debug, Default)]
pub struct Faults {
    pub fail_open: AtomicBool,
    pub fail_append: AtomicBool,
    pub fail_sync: AtomicBool,
    /// Fails the next sync only.
    pub fail_next_sync: AtomicBool,
    pub fail_close: AtomicBool,
    pub syncs: AtomicU64,
}

impl Faults {
    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool, path: &str) -> Result<(), StorageError> {
        if flag.load(Ordering::SeqCst) {
            return Err(injected(path));
        }
        Ok(())
    }
}

fn injected(path: &str) -> StorageError {
    StorageError::Io {
        path: path.to_string(),
        source: io::Error::other("injected fault"),
    }
}

/// Memory store whose calls can be made to fail on demand.
#[derive(Debug, Clone, Default)]
pub struct FaultyStore {
    pub inner: MemoryBucketStore,
    pub faults: Arc<Faults>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BucketStore for FaultyStore {
    fn open(
        &self,
        path_prefix: &str,
        suffix: Option<&str>,
        compression: CompressionKind,
    ) -> Result<Box<dyn BucketFile>, StorageError> {
        self.faults.check(&self.faults.fail_open, path_prefix)?;
        let inner = self.inner.open(path_prefix, suffix, compression)?;
        Ok(Box::new(FaultyFile {
            inner,
            faults: self.faults.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "faulty"
    }
}

struct FaultyFile {
    inner: Box<dyn BucketFile>,
    faults: Arc<Faults>,
}

impl BucketFile for FaultyFile {
    fn path(&self) -> &str {
        self.inner.path()
    }

    fn append(&mut self, payload: &[u8]) -> Result<(), StorageError> {
        self.faults.check(&self.faults.fail_append, self.inner.path())?;
        self.inner.append(payload)
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        self.faults.syncs.fetch_add(1, Ordering::SeqCst);
        self.faults.check(&self.faults.fail_sync, self.inner.path())?;
        if self.faults.fail_next_sync.swap(false, Ordering::SeqCst) {
            return Err(injected(self.inner.path()));
        }
        self.inner.sync()
    }

    fn close(&mut self) -> Result<(), StorageError> {
        self.faults.check(&self.faults.fail_close, self.inner.path())?;
        self.inner.close()
    }

    fn finalize(self: Box<Self>) -> Result<FinishedFile, StorageError> {
        self.faults.check(&self.faults.fail_close, self.inner.path())?;
        self.inner.finalize()
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

pub fn scheduler() -> RollSchedulerRef {
    RollScheduler::new(&SchedulerConfig {
        threads: 2,
        ..SchedulerConfig::default()
    })
    .unwrap()
    .shared()
}

/// Writer over `store` reporting into fresh counters.
pub fn writer_with<S: BucketStore + 'static>(
    config: BucketWriterConfig,
    store: S,
    scheduler: RollSchedulerRef,
) -> (Arc<BucketWriter>, Arc<SinkCounters>) {
    let counters = Arc::new(SinkCounters::new());
    let writer = BucketWriter::builder(config, Arc::new(store), scheduler)
        .counter(counters.clone())
        .build()
        .unwrap();
    (writer, counters)
}
