//! Common configuration primitives shared by the drift crates.

mod loader;
mod vars;

pub use loader::{is_yaml_file, load_yaml_file, parse_yaml};
pub use vars::{InterpolationResult, interpolate};

use serde::{Deserialize, Serialize};

/// Byte size constants (binary/IEC units).
pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;

/// Compression applied to bucket contents by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    #[default]
    None,
    Gzip,
    Zstd,
}

impl CompressionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionKind::None => "none",
            CompressionKind::Gzip => "gzip",
            CompressionKind::Zstd => "zstd",
        }
    }

    /// File extension appended to finalized bucket names, including the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            CompressionKind::None => "",
            CompressionKind::Gzip => ".gz",
            CompressionKind::Zstd => ".zst",
        }
    }
}

impl std::fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
