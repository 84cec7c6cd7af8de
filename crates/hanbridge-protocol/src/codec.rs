//! Tokio codec for HAN line framing.
//!
//! `HanCodec` wraps the [`LineReader`] to plug the HAN wire format into
//! Tokio's `Framed` streams:
//! - [`Decoder`]: yields one reply line at a time
//! - [`Encoder<String>`]: writes one command frame plus the configured
//!   line ending
//!
//! ```text
//! TCP Stream -> Decoder -> String (one reply line)
//! String -> Encoder -> TCP Stream (frame + line ending)
//! ```
//!
//! Over-long lines are discarded by the reader and do not end the stream.
//! At end of stream any partial line is dropped, so the framed stream
//! simply ends and the caller sees the peer close.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::{LineReader, ReadStatus};
use hanbridge_core::{Error, Result};

/// Tokio codec for HAN command and reply lines.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use tokio_util::codec::{Decoder, Encoder};
/// use hanbridge_protocol::HanCodec;
///
/// let mut codec = HanCodec::new();
///
/// let mut rx = BytesMut::from(&b"RS0A13010201\n"[..]);
/// assert_eq!(codec.decode(&mut rx).unwrap().as_deref(), Some("RS0A13010201"));
///
/// let mut tx = BytesMut::new();
/// codec.encode("CA0A13010200".to_string(), &mut tx).unwrap();
/// assert_eq!(&tx[..], b"CA0A13010200");
/// ```
#[derive(Debug)]
pub struct HanCodec {
    /// Line assembly state.
    reader: LineReader,

    /// Bytes appended after every outbound frame.
    line_ending: String,
}

impl HanCodec {
    /// Create a codec that writes bare frames (no line terminator).
    pub fn new() -> Self {
        Self::with_line_ending("")
    }

    /// Create a codec that appends `line_ending` to every outbound frame.
    pub fn with_line_ending(line_ending: impl Into<String>) -> Self {
        Self {
            reader: LineReader::new(),
            line_ending: line_ending.into(),
        }
    }

    pub fn line_ending(&self) -> &str {
        &self.line_ending
    }

    /// Number of over-long reply lines discarded so far.
    pub fn overflows(&self) -> u64 {
        self.reader.overflows()
    }
}

impl Default for HanCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for HanCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if !src.is_empty() {
            // All bytes are now owned by the reader.
            self.reader.feed(src);
            src.clear();
        }

        Ok(self.reader.next_line())
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        let status = self.reader.feed(&[]);
        debug_assert_eq!(status, ReadStatus::Closed);
        Ok(None)
    }
}

impl Encoder<String> for HanCodec {
    type Error = Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        if !item.is_ascii() || item.contains(['\r', '\n']) {
            return Err(Error::malformed(format!(
                "command frame must be one ASCII line: {item:?}"
            )));
        }

        dst.reserve(item.len() + self.line_ending.len());
        dst.extend_from_slice(item.as_bytes());
        dst.extend_from_slice(self.line_ending.as_bytes());

        Ok(())
    }
}
