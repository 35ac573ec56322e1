//! Common error types shared between the drift crates.
//!
//! Storage, configuration and scheduler errors live here so that backing
//! stores and the application crate can agree on them.

use snafu::prelude::*;

// ============ Storage Errors ============

/// Errors raised by a backing store while creating, writing or finalizing a bucket.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// IO error on a bucket file.
    #[snafu(display("IO error on {path}: {source}"))]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Failed to create the parent directory of a bucket.
    #[snafu(display("Failed to create directory {path}: {source}"))]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    /// Failed to rename an in-progress bucket to its final name.
    #[snafu(display("Failed to rename {from} to {to}: {source}"))]
    Rename {
        from: String,
        to: String,
        source: std::io::Error,
    },

    /// Operation on a bucket handle that was already closed.
    #[snafu(display("Bucket {path} is already closed"))]
    HandleClosed { path: String },

    /// Path prefix cannot be turned into a bucket path.
    #[snafu(display("Invalid bucket path prefix: {prefix}"))]
    InvalidPrefix { prefix: String },
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Bucket path prefix is empty.
    #[snafu(display("Bucket path prefix cannot be empty"))]
    EmptyPathPrefix,

    /// Scheduler was configured without worker threads.
    #[snafu(display("Scheduler must have at least one worker thread"))]
    ZeroSchedulerThreads,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file {}: {source}", path.display()))]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// Unsupported config file format.
    #[snafu(display("Unsupported config format for {}: only .yaml/.yml supported", path.display()))]
    UnsupportedFormat { path: std::path::PathBuf },

    /// Multiple configuration errors occurred.
    #[snafu(display("Multiple config errors:\n{}", errors.join("\n")))]
    MultipleErrors { errors: Vec<String> },
}

// ============ Scheduler Errors ============

/// Errors that can occur while starting the rollover scheduler.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SchedulerError {
    /// Failed to build the scheduler runtime.
    #[snafu(display("Failed to build scheduler runtime: {source}"))]
    RuntimeBuild { source: std::io::Error },

    /// Scheduler was asked to start without worker threads.
    #[snafu(display("Scheduler needs at least one worker thread"))]
    NoWorkers,
}
