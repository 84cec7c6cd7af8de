//! Line reader for HAN server replies.
//!
//! The HAN server sends one reply per line. A TCP read may carry a partial
//! line, several lines, or nothing at all, so the reader accumulates bytes
//! until it sees a newline and queues every complete line.
//!
//! # Usage
//!
//! ```
//! use hanbridge_protocol::{LineReader, ReadStatus};
//!
//! let mut reader = LineReader::new();
//!
//! assert_eq!(reader.feed(b"RS0A13"), ReadStatus::Partial);
//! assert_eq!(reader.feed(b"010201\n"), ReadStatus::Ready);
//! assert_eq!(reader.next_line().as_deref(), Some("RS0A13010201"));
//!
//! // A zero-length read means the peer closed the connection.
//! assert_eq!(reader.feed(&[]), ReadStatus::Closed);
//! ```

use bytes::BytesMut;
use hanbridge_core::constants::MAX_LINE_LENGTH;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Recommended initial capacity for the line queue.
const INITIAL_LINE_QUEUE_CAPACITY: usize = 4;

/// State machine states for line assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Collecting bytes of the current line.
    Accumulating,

    /// The current line overflowed the working buffer; bytes are dropped
    /// until the next newline.
    Discarding,
}

/// Outcome of feeding a chunk into the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// At least one complete line is ready.
    Ready,
    /// A line is partially buffered.
    Partial,
    /// Nothing is buffered.
    Empty,
    /// The peer closed the stream (zero-length read). Any partial line has
    /// been discarded.
    Closed,
}

/// Accumulate-until-newline reader with a fixed working-set size.
///
/// ```text
/// ┌──────────────┐  '\n'          ┌──────────────┐
/// │ Accumulating │───────────────>│  line queued │
/// └──────────────┘                └──────────────┘
///    │        ^
///    │ len >  │ '\n'
///    │ max    │
///    v        │
/// ┌──────────────┐
/// │  Discarding  │
/// └──────────────┘
/// ```
#[derive(Debug)]
pub struct LineReader {
    /// Bytes of the line currently being assembled.
    partial: BytesMut,

    /// Current state of the reader.
    state: ReaderState,

    /// Complete lines ready for extraction.
    lines: VecDeque<String>,

    /// Largest line accepted, in bytes (excluding the newline).
    max_line_length: usize,

    /// Number of lines discarded because they were too long.
    overflows: u64,
}

impl LineReader {
    /// Create a reader with the default working-set size.
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            partial: BytesMut::with_capacity(max_line_length),
            state: ReaderState::Accumulating,
            lines: VecDeque::with_capacity(INITIAL_LINE_QUEUE_CAPACITY),
            max_line_length,
            overflows: 0,
        }
    }

    /// Feed bytes read from the socket.
    ///
    /// An empty slice is treated as end of stream.
    pub fn feed(&mut self, bytes: &[u8]) -> ReadStatus {
        if bytes.is_empty() {
            if !self.partial.is_empty() {
                debug!(
                    discarded = self.partial.len(),
                    "Peer closed with a partial line buffered"
                );
            }
            self.reset_line();
            return ReadStatus::Closed;
        }

        for &b in bytes {
            match self.state {
                ReaderState::Accumulating => {
                    if b == b'\n' {
                        self.complete_line();
                    } else if self.partial.len() >= self.max_line_length {
                        self.overflow();
                    } else {
                        self.partial.extend_from_slice(&[b]);
                    }
                }
                ReaderState::Discarding => {
                    if b == b'\n' {
                        self.state = ReaderState::Accumulating;
                    }
                }
            }
        }

        self.status()
    }

    /// Extract the oldest complete line, if any.
    pub fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn lines_available(&self) -> usize {
        self.lines.len()
    }

    /// Number of over-long lines discarded so far.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Drop all buffered data (used when the connection is torn down).
    pub fn clear(&mut self) {
        self.reset_line();
        self.lines.clear();
    }

    fn status(&self) -> ReadStatus {
        if !self.lines.is_empty() {
            ReadStatus::Ready
        } else if !self.partial.is_empty() || self.state == ReaderState::Discarding {
            ReadStatus::Partial
        } else {
            ReadStatus::Empty
        }
    }

    fn complete_line(&mut self) {
        let raw = self.partial.split();
        let raw = raw.strip_suffix(b"\r").unwrap_or(&raw);
        if raw.is_empty() {
            return;
        }
        self.lines
            .push_back(String::from_utf8_lossy(raw).into_owned());
    }

    fn overflow(&mut self) {
        warn!(
            max = self.max_line_length,
            "Reply line exceeds working buffer, discarding"
        );
        self.overflows += 1;
        self.partial.clear();
        self.state = ReaderState::Discarding;
    }

    fn reset_line(&mut self) {
        self.partial.clear();
        self.state = ReaderState::Accumulating;
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}
