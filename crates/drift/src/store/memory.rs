//! In-process bucket store.
//!
//! Keeps finalized buckets in memory along with volume totals. Useful for
//! embedding and for observing exactly what a writer did.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use drift_core::error::{HandleClosedSnafu, IoSnafu};
use drift_core::{CompressionKind, FinishedFile, StorageError};
use snafu::prelude::*;

use super::compression::BucketEncoder;
use super::{BucketFile, BucketStore};

/// A finalized bucket held by [`MemoryBucketStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub path: String,
    /// Stored bytes, compressed according to `compression`.
    pub data: Bytes,
    pub compression: CompressionKind,
    pub record_count: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    objects: Vec<MemoryObject>,
    files_opened: u64,
    files_closed: u64,
    events_written: u64,
    bytes_written: u64,
}

/// Bucket store backed by process memory. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBucketStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Finalized buckets in the order they were finalized.
    pub fn objects(&self) -> Vec<MemoryObject> {
        self.state().objects.clone()
    }

    pub fn files_opened(&self) -> u64 {
        self.state().files_opened
    }

    pub fn files_closed(&self) -> u64 {
        self.state().files_closed
    }

    /// Number of successful appends across all buckets.
    pub fn events_written(&self) -> u64 {
        self.state().events_written
    }

    /// Payload bytes appended across all buckets, before compression.
    pub fn bytes_written(&self) -> u64 {
        self.state().bytes_written
    }
}

impl BucketStore for MemoryBucketStore {
    fn open(
        &self,
        path_prefix: &str,
        suffix: Option<&str>,
        compression: CompressionKind,
    ) -> Result<Box<dyn BucketFile>, StorageError> {
        let mut state = self.state();
        state.next_id += 1;
        state.files_opened += 1;

        let path = format!(
            "{}.{}{}{}",
            path_prefix,
            state.next_id,
            suffix.unwrap_or_default(),
            compression.extension()
        );
        let encoder =
            BucketEncoder::new(Vec::new(), compression).context(IoSnafu { path: &path })?;

        Ok(Box::new(MemoryBucketFile {
            state: self.state.clone(),
            path,
            compression,
            encoder: Some(encoder),
            data: None,
            record_count: 0,
            payload_bytes: 0,
        }))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryBucketFile {
    state: Arc<Mutex<MemoryState>>,
    path: String,
    compression: CompressionKind,
    encoder: Option<BucketEncoder<Vec<u8>>>,
    /// Set by `close`.
    data: Option<Vec<u8>>,
    record_count: u64,
    payload_bytes: u64,
}

impl MemoryBucketFile {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BucketFile for MemoryBucketFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn append(&mut self, payload: &[u8]) -> Result<(), StorageError> {
        let encoder = self.encoder.as_mut().context(HandleClosedSnafu {
            path: self.path.as_str(),
        })?;
        encoder.write_all(payload).context(IoSnafu {
            path: self.path.as_str(),
        })?;

        self.record_count += 1;
        self.payload_bytes += payload.len() as u64;

        let mut state = self.state();
        state.events_written += 1;
        state.bytes_written += payload.len() as u64;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        let encoder = self.encoder.as_mut().context(HandleClosedSnafu {
            path: self.path.as_str(),
        })?;
        encoder.flush().context(IoSnafu {
            path: self.path.as_str(),
        })
    }

    fn close(&mut self) -> Result<(), StorageError> {
        let Some(encoder) = self.encoder.take() else {
            return Ok(());
        };
        let data = encoder.finish().context(IoSnafu {
            path: self.path.as_str(),
        })?;
        self.data = Some(data);
        self.state().files_closed += 1;
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<FinishedFile, StorageError> {
        self.close()?;

        let data = Bytes::from(self.data.take().unwrap_or_default());
        let finished = FinishedFile {
            path: self.path.clone(),
            size: data.len() as u64,
            record_count: self.record_count,
            payload_bytes: self.payload_bytes,
        };

        self.state().objects.push(MemoryObject {
            path: self.path.clone(),
            data,
            compression: self.compression,
            record_count: self.record_count,
        });

        Ok(finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_volume_and_objects() {
        let store = MemoryBucketStore::new();

        let mut file = store
            .open("/mem/events", Some(".txt"), CompressionKind::None)
            .unwrap();
        assert_eq!(file.path(), "/mem/events.1.txt");
        file.append(b"foo").unwrap();
        file.append(b"barbaz").unwrap();
        file.sync().unwrap();
        file.close().unwrap();
        let finished = file.finalize().unwrap();

        assert_eq!(finished.record_count, 2);
        assert_eq!(finished.size, 9);
        assert_eq!(store.files_opened(), 1);
        assert_eq!(store.files_closed(), 1);
        assert_eq!(store.events_written(), 2);
        assert_eq!(store.bytes_written(), 9);

        let objects = store.objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].data.as_ref(), b"foobarbaz");
    }

    #[test]
    fn test_close_counts_once() {
        let store = MemoryBucketStore::new();
        let mut file = store.open("/mem/events", None, CompressionKind::None).unwrap();

        file.close().unwrap();
        file.close().unwrap();
        file.finalize().unwrap();

        assert_eq!(store.files_closed(), 1);
    }

    #[test]
    fn test_zstd_objects() {
        let store = MemoryBucketStore::new();
        let mut file = store.open("/mem/events", None, CompressionKind::Zstd).unwrap();
        file.append(b"compressed payload").unwrap();
        let finished = file.finalize().unwrap();

        assert!(finished.path.ends_with(".zst"));
        let object = &store.objects()[0];
        assert_eq!(
            zstd::decode_all(object.data.as_ref()).unwrap(),
            b"compressed payload"
        );
    }
}
