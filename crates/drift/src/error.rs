//! Error types for the drift bucket writer.

use snafu::prelude::*;

// Re-export common errors
pub use drift_core::error::{ConfigError, SchedulerError, StorageError};

/// Errors returned by [`BucketWriter`](crate::bucket::BucketWriter) operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WriterError {
    /// The backing store could not open a new bucket.
    #[snafu(display("Failed to open bucket for {path_prefix}: {source}"))]
    Open {
        path_prefix: String,
        source: StorageError,
    },

    /// Appending a record to the open bucket failed.
    #[snafu(display("Failed to append to {path}: {source}"))]
    Append { path: String, source: StorageError },

    /// Syncing the open bucket failed.
    #[snafu(display("Failed to sync {path}: {source}"))]
    Sync { path: String, source: StorageError },

    /// Closing or finalizing the bucket failed.
    #[snafu(display("Failed to close {path} ({reason}): {source}"))]
    Close {
        path: String,
        reason: drift_core::RollReason,
        source: StorageError,
    },

    /// The writer has been shut down and accepts no more records.
    #[snafu(display("Bucket writer for {path_prefix} has been shut down"))]
    Retired { path_prefix: String },

    /// A thread panicked while holding the writer lock.
    #[snafu(display("Bucket writer lock for {path_prefix} is poisoned"))]
    LockPoisoned { path_prefix: String },
}

impl WriterError {
    /// Whether the error came from the backing store rather than the writer itself.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            WriterError::Open { .. }
                | WriterError::Append { .. }
                | WriterError::Sync { .. }
                | WriterError::Close { .. }
        )
    }
}

/// Top-level errors for the drift binary.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DriftError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Scheduler error.
    #[snafu(display("Scheduler error: {source}"))]
    Scheduler { source: SchedulerError },

    /// Writer error.
    #[snafu(display("Writer error: {source}"))]
    Writer { source: WriterError },

    /// Failed to read input records.
    #[snafu(display("Failed to read input: {source}"))]
    Input { source: std::io::Error },
}

impl From<ConfigError> for DriftError {
    fn from(source: ConfigError) -> Self {
        DriftError::Config { source }
    }
}

impl From<SchedulerError> for DriftError {
    fn from(source: SchedulerError) -> Self {
        DriftError::Scheduler { source }
    }
}

impl From<WriterError> for DriftError {
    fn from(source: WriterError) -> Self {
        DriftError::Writer { source }
    }
}
