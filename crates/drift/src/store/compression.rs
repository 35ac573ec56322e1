//! Streaming encoders applied to bucket contents.

use std::io::{self, Write};

use drift_core::CompressionKind;
use flate2::write::GzEncoder;

/// Compresses appended bytes on their way to `W`.
pub(crate) enum BucketEncoder<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
    Zstd(zstd::stream::write::Encoder<'static, W>),
}

impl<W: Write> BucketEncoder<W> {
    pub(crate) fn new(inner: W, kind: CompressionKind) -> io::Result<Self> {
        Ok(match kind {
            CompressionKind::None => BucketEncoder::Plain(inner),
            CompressionKind::Gzip => {
                BucketEncoder::Gzip(GzEncoder::new(inner, flate2::Compression::default()))
            }
            CompressionKind::Zstd => BucketEncoder::Zstd(zstd::stream::write::Encoder::new(
                inner,
                zstd::DEFAULT_COMPRESSION_LEVEL,
            )?),
        })
    }

    pub(crate) fn get_ref(&self) -> &W {
        match self {
            BucketEncoder::Plain(w) => w,
            BucketEncoder::Gzip(w) => w.get_ref(),
            BucketEncoder::Zstd(w) => w.get_ref(),
        }
    }

    /// Write any trailer and hand back the inner writer.
    pub(crate) fn finish(self) -> io::Result<W> {
        match self {
            BucketEncoder::Plain(mut w) => {
                w.flush()?;
                Ok(w)
            }
            BucketEncoder::Gzip(w) => w.finish(),
            BucketEncoder::Zstd(w) => w.finish(),
        }
    }
}

impl<W: Write> Write for BucketEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            BucketEncoder::Plain(w) => w.write(buf),
            BucketEncoder::Gzip(w) => w.write(buf),
            BucketEncoder::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            BucketEncoder::Plain(w) => w.flush(),
            BucketEncoder::Gzip(w) => w.flush(),
            BucketEncoder::Zstd(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    const PAYLOAD: &[u8] = b"first record\nsecond record\n";

    fn encode(kind: CompressionKind) -> Vec<u8> {
        let mut encoder = BucketEncoder::new(Vec::new(), kind).unwrap();
        encoder.write_all(PAYLOAD).unwrap();
        encoder.flush().unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_plain_passthrough() {
        assert_eq!(encode(CompressionKind::None), PAYLOAD);
    }

    #[test]
    fn test_gzip_output_decodes() {
        let encoded = encode(CompressionKind::Gzip);
        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(encoded.as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, PAYLOAD);
    }

    #[test]
    fn test_zstd_output_decodes() {
        let encoded = encode(CompressionKind::Zstd);
        assert_eq!(zstd::decode_all(encoded.as_slice()).unwrap(), PAYLOAD);
    }
}
