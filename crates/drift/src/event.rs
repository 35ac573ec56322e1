//! The record type accepted by bucket writers.

use std::collections::BTreeMap;

use bytes::Bytes;

/// A single record: an opaque body plus string headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl Event {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Add a header, replacing any previous value for the key.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

impl From<&str> for Event {
    fn from(body: &str) -> Self {
        Self::new(Bytes::copy_from_slice(body.as_bytes()))
    }
}

impl From<String> for Event {
    fn from(body: String) -> Self {
        Self::new(body)
    }
}
