//! Local filesystem bucket store.
//!
//! Buckets are written under an in-use name ending in [`IN_USE_SUFFIX`] and
//! renamed to their final name on finalize, so readers listing the directory
//! never pick up a partially written bucket.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use drift_core::error::{
    CreateDirSnafu, HandleClosedSnafu, InvalidPrefixSnafu, IoSnafu, RenameSnafu,
};
use drift_core::{CompressionKind, FinishedFile, StorageError};
use snafu::prelude::*;
use tracing::debug;
use uuid::Uuid;

use super::compression::BucketEncoder;
use super::{BucketFile, BucketStore};

/// Suffix carried by buckets that are still being written.
pub const IN_USE_SUFFIX: &str = ".tmp";

/// Stores buckets as files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBucketStore;

impl LocalBucketStore {
    pub fn new() -> Self {
        Self
    }

    fn final_path(path_prefix: &str, suffix: Option<&str>, compression: CompressionKind) -> String {
        format!(
            "{}.{}{}{}",
            path_prefix,
            Uuid::now_v7(),
            suffix.unwrap_or_default(),
            compression.extension()
        )
    }
}

impl BucketStore for LocalBucketStore {
    fn open(
        &self,
        path_prefix: &str,
        suffix: Option<&str>,
        compression: CompressionKind,
    ) -> Result<Box<dyn BucketFile>, StorageError> {
        ensure!(
            !path_prefix.is_empty() && !path_prefix.ends_with('/'),
            InvalidPrefixSnafu {
                prefix: path_prefix
            }
        );

        let final_path = Self::final_path(path_prefix, suffix, compression);
        let in_use_path = format!("{final_path}{IN_USE_SUFFIX}");

        let parent = Path::new(&final_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            fs::create_dir_all(parent).context(CreateDirSnafu {
                path: parent.display().to_string(),
            })?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&in_use_path)
            .context(IoSnafu {
                path: in_use_path.as_str(),
            })?;
        let encoder = BucketEncoder::new(BufWriter::new(file), compression).context(IoSnafu {
            path: in_use_path.as_str(),
        })?;

        debug!(path = %in_use_path, %compression, "Created bucket file");

        Ok(Box::new(LocalBucketFile {
            in_use_path,
            final_path,
            encoder: Some(encoder),
            record_count: 0,
            payload_bytes: 0,
        }))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// A bucket file being written on the local filesystem.
struct LocalBucketFile {
    in_use_path: String,
    final_path: String,
    /// `None` once closed.
    encoder: Option<BucketEncoder<BufWriter<File>>>,
    record_count: u64,
    payload_bytes: u64,
}

impl LocalBucketFile {
    fn encoder(&mut self) -> Result<&mut BucketEncoder<BufWriter<File>>, StorageError> {
        self.encoder.as_mut().context(HandleClosedSnafu {
            path: self.in_use_path.as_str(),
        })
    }
}

impl BucketFile for LocalBucketFile {
    fn path(&self) -> &str {
        &self.in_use_path
    }

    fn append(&mut self, payload: &[u8]) -> Result<(), StorageError> {
        let path = self.in_use_path.clone();
        self.encoder()?
            .write_all(payload)
            .context(IoSnafu { path })?;
        self.record_count += 1;
        self.payload_bytes += payload.len() as u64;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        let path = self.in_use_path.clone();
        let encoder = self.encoder()?;
        encoder.flush().context(IoSnafu { path: path.as_str() })?;
        encoder.get_ref().get_ref().sync_data().context(IoSnafu { path })
    }

    fn close(&mut self) -> Result<(), StorageError> {
        let Some(encoder) = self.encoder.take() else {
            return Ok(());
        };
        let path = self.in_use_path.as_str();

        let file = encoder
            .finish()
            .context(IoSnafu { path })?
            .into_inner()
            .map_err(|e| e.into_error())
            .context(IoSnafu { path })?;
        file.sync_all().context(IoSnafu { path })
    }

    fn finalize(mut self: Box<Self>) -> Result<FinishedFile, StorageError> {
        self.close()?;

        fs::rename(&self.in_use_path, &self.final_path).context(RenameSnafu {
            from: self.in_use_path.as_str(),
            to: self.final_path.as_str(),
        })?;
        let size = fs::metadata(&self.final_path)
            .context(IoSnafu {
                path: self.final_path.as_str(),
            })?
            .len();

        Ok(FinishedFile {
            path: self.final_path,
            size,
            record_count: self.record_count,
            payload_bytes: self.payload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn prefix(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_str().unwrap().to_string()
    }

    #[test]
    fn test_bucket_lifecycle_renames_on_finalize() {
        let dir = TempDir::new().unwrap();
        let store = LocalBucketStore::new();

        let mut file = store
            .open(&prefix(&dir, "events"), Some(".log"), CompressionKind::None)
            .unwrap();
        let in_use = file.path().to_string();
        assert!(in_use.ends_with(".log.tmp"));
        assert!(Path::new(&in_use).exists());

        file.append(b"foo\n").unwrap();
        file.append(b"bar\n").unwrap();
        file.sync().unwrap();
        file.close().unwrap();
        let finished = file.finalize().unwrap();

        assert!(!Path::new(&in_use).exists());
        assert!(finished.path.ends_with(".log"));
        assert_eq!(finished.record_count, 2);
        assert_eq!(finished.payload_bytes, 8);
        assert_eq!(finished.size, 8);
        assert_eq!(fs::read(&finished.path).unwrap(), b"foo\nbar\n");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = LocalBucketStore::new();

        let file = store
            .open(&prefix(&dir, "a/b/c/events"), None, CompressionKind::None)
            .unwrap();
        let finished = file.finalize().unwrap();

        assert!(finished.path.starts_with(&prefix(&dir, "a/b/c/events.")));
        assert_eq!(finished.size, 0);
    }

    #[test]
    fn test_gzip_bucket() {
        let dir = TempDir::new().unwrap();
        let store = LocalBucketStore::new();

        let mut file = store
            .open(&prefix(&dir, "events"), None, CompressionKind::Gzip)
            .unwrap();
        for _ in 0..100 {
            file.append(b"the same line again\n").unwrap();
        }
        file.sync().unwrap();
        file.close().unwrap();
        let finished = file.finalize().unwrap();

        assert!(finished.path.ends_with(".gz"));
        assert_eq!(finished.payload_bytes, 2000);
        assert!(finished.size < finished.payload_bytes);

        let mut decoded = String::new();
        flate2::read::GzDecoder::new(File::open(&finished.path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded.lines().count(), 100);
    }

    #[test]
    fn test_append_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let store = LocalBucketStore::new();

        let mut file = store
            .open(&prefix(&dir, "events"), None, CompressionKind::None)
            .unwrap();
        file.close().unwrap();
        file.close().unwrap();

        let err = file.append(b"late").unwrap_err();
        assert!(matches!(err, StorageError::HandleClosed { .. }));
    }

    #[test]
    fn test_rejects_directory_prefix() {
        let store = LocalBucketStore::new();
        assert!(matches!(
            store.open("", None, CompressionKind::None),
            Err(StorageError::InvalidPrefix { .. })
        ));
        assert!(matches!(
            store.open("/tmp/drift/", None, CompressionKind::None),
            Err(StorageError::InvalidPrefix { .. })
        ));
    }

    #[test]
    fn test_names_are_unique() {
        let dir = TempDir::new().unwrap();
        let store = LocalBucketStore::new();
        let prefix = prefix(&dir, "events");

        let first = store.open(&prefix, None, CompressionKind::None).unwrap();
        let second = store.open(&prefix, None, CompressionKind::None).unwrap();
        assert_ne!(first.path(), second.path());
    }
}
