//! drift-core: shared components for the drift bucket writer.
//!
//! - `error` - storage, configuration and scheduler errors
//! - `config/` - byte units, compression kinds, YAML loading with env interpolation
//! - `metrics/` - metric events and the `emit!` macro
//! - `tracing` - subscriber setup for binaries
//! - `types` - `FinishedFile`

pub mod config;
pub mod error;
pub mod metrics;
pub mod tracing;
pub mod types;

// Re-export commonly used items
pub use config::{CompressionKind, KB, MB, interpolate, load_yaml_file, parse_yaml};
pub use error::{ConfigError, SchedulerError, StorageError};
pub use self::metrics::events::RollReason;
pub use self::tracing::init_tracing;
pub use types::FinishedFile;
