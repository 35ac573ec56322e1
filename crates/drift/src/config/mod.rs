//! Configuration for the rollover scheduler and bucket writers.
//!
//! Thresholds use `0` to disable a policy. Defaults follow the usual
//! small-file settings of an ingestion sink: roll every 30 seconds, 1 KiB
//! or 10 events, whichever comes first.

mod cli;

pub use cli::CliArgs;

use std::path::Path;
use std::time::Duration;

use drift_core::{CompressionKind, ConfigError, load_yaml_file, parse_yaml};
use serde::{Deserialize, Serialize};

use crate::formatter::FormatKind;

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub writer: BucketWriterConfig,
}

impl Config {
    /// Parse YAML (with env interpolation) and validate.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = parse_yaml(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file and validate it.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let config: Config = load_yaml_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the whole configuration, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors: Vec<String> = [self.scheduler.validate(), self.writer.validate()]
            .into_iter()
            .filter_map(Result::err)
            .map(|e| e.to_string())
            .collect();

        match errors.len() {
            0 => Ok(()),
            _ => Err(ConfigError::MultipleErrors { errors }),
        }
    }
}

/// Rollover scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Worker threads shared by every writer's timers.
    #[serde(default = "default_scheduler_threads")]
    pub threads: usize,
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    /// How long shutdown waits for a running roll to finish.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threads: default_scheduler_threads(),
            thread_name: default_thread_name(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::ZeroSchedulerThreads);
        }
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn default_scheduler_threads() -> usize {
    1
}

fn default_thread_name() -> String {
    "drift-roller".to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

/// Settings for one bucket writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BucketWriterConfig {
    /// Every bucket name starts with this prefix.
    pub path_prefix: String,
    /// Appended to every bucket name, before the compression extension.
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub compression: CompressionKind,
    #[serde(default)]
    pub format: FormatKind,
    /// Maximum bucket age in seconds (0 = disabled).
    #[serde(default = "default_roll_interval_secs")]
    pub roll_interval_secs: u64,
    /// Payload bytes per bucket (0 = disabled).
    #[serde(default = "default_roll_size")]
    pub roll_size: u64,
    /// Events per bucket (0 = disabled).
    #[serde(default = "default_roll_count")]
    pub roll_count: u64,
    /// Close a bucket after this many seconds without appends (0 = disabled).
    #[serde(default)]
    pub idle_timeout_secs: u64,
    /// Sync the open bucket every this many appends (0 = only on close).
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

fn default_roll_interval_secs() -> u64 {
    30
}

fn default_roll_size() -> u64 {
    1024
}

fn default_roll_count() -> u64 {
    10
}

fn default_batch_size() -> u64 {
    100
}

impl BucketWriterConfig {
    /// Config with default thresholds for the given prefix.
    pub fn new(path_prefix: impl Into<String>) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            suffix: None,
            compression: CompressionKind::default(),
            format: FormatKind::default(),
            roll_interval_secs: default_roll_interval_secs(),
            roll_size: default_roll_size(),
            roll_count: default_roll_count(),
            idle_timeout_secs: 0,
            batch_size: default_batch_size(),
        }
    }

    /// Config with every roll policy disabled.
    pub fn unbounded(path_prefix: impl Into<String>) -> Self {
        Self::new(path_prefix)
            .with_roll_interval_secs(0)
            .with_roll_size(0)
            .with_roll_count(0)
    }

    pub fn with_roll_interval_secs(mut self, secs: u64) -> Self {
        self.roll_interval_secs = secs;
        self
    }

    pub fn with_roll_size(mut self, bytes: u64) -> Self {
        self.roll_size = bytes;
        self
    }

    pub fn with_roll_count(mut self, count: u64) -> Self {
        self.roll_count = count;
        self
    }

    pub fn with_idle_timeout_secs(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_compression(mut self, compression: CompressionKind) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_format(mut self, format: FormatKind) -> Self {
        self.format = format;
        self
    }

    /// `None` when the interval policy is disabled.
    pub fn roll_interval(&self) -> Option<Duration> {
        (self.roll_interval_secs > 0).then(|| Duration::from_secs(self.roll_interval_secs))
    }

    /// `None` when the idle policy is disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyPathPrefix);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_defaults() {
        let yaml = r#"
writer:
  path_prefix: /var/lib/drift/events
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.scheduler, SchedulerConfig::default());
        assert_eq!(config.scheduler.threads, 1);
        assert_eq!(config.writer.roll_interval_secs, 30);
        assert_eq!(config.writer.roll_size, 1024);
        assert_eq!(config.writer.roll_count, 10);
        assert_eq!(config.writer.idle_timeout_secs, 0);
        assert_eq!(config.writer.batch_size, 100);
        assert_eq!(config.writer.compression, CompressionKind::None);
        assert_eq!(config.writer.format, FormatKind::Text);
        assert_eq!(config.writer.suffix, None);
    }

    #[test]
    fn test_yaml_full() {
        let yaml = r#"
scheduler:
  threads: 2
  thread_name: roller
  shutdown_timeout_secs: 1
writer:
  path_prefix: /data/events
  suffix: .log
  compression: zstd
  format: json
  roll_interval_secs: 0
  roll_size: 134217728
  roll_count: 0
  idle_timeout_secs: 60
  batch_size: 0
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.scheduler.threads, 2);
        assert_eq!(config.scheduler.shutdown_timeout(), Duration::from_secs(1));
        assert_eq!(config.writer.suffix.as_deref(), Some(".log"));
        assert_eq!(config.writer.compression, CompressionKind::Zstd);
        assert_eq!(config.writer.format, FormatKind::Json);
        assert_eq!(config.writer.roll_interval(), None);
        assert_eq!(config.writer.roll_size, 128 * drift_core::MB);
        assert_eq!(config.writer.idle_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = r#"
writer:
  path_prefix: /data/events
  roll_bytes: 10
"#;
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(ConfigError::YamlParse { .. })
        ));
    }

    #[test]
    fn test_validate_collects_errors() {
        let yaml = r#"
scheduler:
  threads: 0
writer:
  path_prefix: "  "
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        match err {
            ConfigError::MultipleErrors { errors } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_env_interpolation() {
        // SAFETY: variable name is unique to this test.
        unsafe { std::env::set_var("DRIFT_CONFIG_TEST_PREFIX", "/srv/drift") };
        let yaml = r#"
writer:
  path_prefix: ${DRIFT_CONFIG_TEST_PREFIX}/events
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.writer.path_prefix, "/srv/drift/events");
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("drift.yaml");
        std::fs::write(&path, "writer:\n  path_prefix: /data/events\n  roll_count: 0\n").unwrap();

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.writer.path_prefix, "/data/events");
        assert_eq!(config.writer.roll_count, 0);
    }

    #[test]
    fn test_builder_methods() {
        let config = BucketWriterConfig::unbounded("/tmp/file")
            .with_roll_count(100)
            .with_suffix(".txt")
            .with_compression(CompressionKind::Gzip);

        assert_eq!(config.roll_count, 100);
        assert_eq!(config.roll_size, 0);
        assert_eq!(config.roll_interval(), None);
        assert_eq!(config.suffix.as_deref(), Some(".txt"));
        assert!(config.validate().is_ok());
    }
}
