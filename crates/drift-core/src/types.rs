//! Types shared between backing stores and bucket writers.

/// A bucket that has been closed and finalized by its backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedFile {
    /// Final location of the bucket.
    pub path: String,
    /// Bytes stored, after compression.
    pub size: u64,
    /// Number of records appended.
    pub record_count: u64,
    /// Formatted payload bytes appended, before compression.
    pub payload_bytes: u64,
}
