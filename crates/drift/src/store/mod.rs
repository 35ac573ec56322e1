//! Backing stores that persist bucket contents.
//!
//! A [`BucketStore`] creates buckets; each bucket is a [`BucketFile`] handle
//! exclusively owned by one writer. Writers drive every handle through the
//! same sequence: `append`* / `sync`*, then `sync`, `close`, `finalize`.

mod compression;
mod local;
mod memory;

pub use local::{IN_USE_SUFFIX, LocalBucketStore};
pub use memory::{MemoryBucketStore, MemoryObject};

use std::sync::Arc;

use drift_core::{CompressionKind, FinishedFile, StorageError};

/// A reference-counted store shared by writers.
pub type BucketStoreRef = Arc<dyn BucketStore>;

/// Creates bucket handles in a storage backend.
pub trait BucketStore: Send + Sync {
    /// Create a new bucket whose name starts with `path_prefix`.
    ///
    /// The store picks the unique part of the name, then appends `suffix`
    /// and the extension of `compression`.
    fn open(
        &self,
        path_prefix: &str,
        suffix: Option<&str>,
        compression: CompressionKind,
    ) -> Result<Box<dyn BucketFile>, StorageError>;

    /// Human-readable name of this store (for logging).
    fn name(&self) -> &'static str;
}

/// An open bucket.
pub trait BucketFile: Send {
    /// Location the bucket is written to while open.
    fn path(&self) -> &str;

    fn append(&mut self, payload: &[u8]) -> Result<(), StorageError>;

    /// Push buffered data down to the backend.
    fn sync(&mut self) -> Result<(), StorageError>;

    /// Flush remaining data and release the underlying resource.
    fn close(&mut self) -> Result<(), StorageError>;

    /// Publish a closed bucket under its final name.
    fn finalize(self: Box<Self>) -> Result<FinishedFile, StorageError>;
}
