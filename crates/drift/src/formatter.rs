//! Record-to-bytes formatters.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::Event;

/// A reference-counted formatter shared by writers.
pub type FormatterRef = Arc<dyn Formatter>;

/// Turns a record into the bytes appended to a bucket.
///
/// Implementations are pure: the same event always yields the same payload.
pub trait Formatter: Send + Sync {
    fn format(&self, event: &Event) -> Bytes;

    /// Human-readable name of this formatter (for logging).
    fn name(&self) -> &'static str;
}

/// Output formats selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// Body bytes only.
    #[default]
    Text,
    /// Body bytes followed by a newline.
    Line,
    /// One JSON object per line with headers and body.
    Json,
}

impl FormatKind {
    pub fn build(self) -> FormatterRef {
        match self {
            FormatKind::Text => Arc::new(TextFormatter::default()),
            FormatKind::Line => Arc::new(TextFormatter::with_newline()),
            FormatKind::Json => Arc::new(JsonFormatter),
        }
    }
}

/// Writes the event body unchanged, optionally newline-terminated.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormatter {
    append_newline: bool,
}

impl TextFormatter {
    pub fn with_newline() -> Self {
        Self {
            append_newline: true,
        }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, event: &Event) -> Bytes {
        if !self.append_newline {
            return event.body.clone();
        }
        let mut buf = BytesMut::with_capacity(event.body.len() + 1);
        buf.put_slice(&event.body);
        buf.put_u8(b'\n');
        buf.freeze()
    }

    fn name(&self) -> &'static str {
        if self.append_newline { "line" } else { "text" }
    }
}

/// Writes `{"headers": {...}, "body": "..."}` followed by a newline.
///
/// Bodies that are not valid UTF-8 are converted lossily.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, event: &Event) -> Bytes {
        let headers: Map<String, Value> = event
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        let mut object = Map::new();
        object.insert("headers".to_string(), Value::Object(headers));
        object.insert(
            "body".to_string(),
            Value::String(String::from_utf8_lossy(&event.body).into_owned()),
        );

        let mut line = Value::Object(object).to_string().into_bytes();
        line.push(b'\n');
        Bytes::from(line)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
