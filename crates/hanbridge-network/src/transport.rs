//! Line transport abstraction.
//!
//! The gateway engine talks to the HAN server only through this trait, so
//! the TCP client and the test double are interchangeable.
//!
//! All methods use native `async fn` in traits (Edition 2024 RPITIT). The
//! engine owns its transport and runs on a single task, so the returned
//! futures do not need to be `Send`.

#![allow(async_fn_in_trait)]

use futures::FutureExt;
use thiserror::Error;

/// Something read from the HAN server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// One complete line, terminator stripped.
    Line(String),

    /// No complete line is available right now.
    Empty,

    /// The peer closed the connection. The transport is now disconnected.
    Closed,

    /// The read failed. The transport is now disconnected.
    Error(String),
}

/// Errors that can occur during transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// Transport is not connected to the HAN server
    #[error("Not connected to HAN server")]
    NotConnected,

    /// Connection attempt timed out
    #[error("Connection timeout after {0}ms")]
    ConnectionTimeout(u64),

    /// Write operation timed out
    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    /// Connection was lost during operation
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Frame rejected by the codec
    #[error("Protocol error: {0}")]
    Protocol(#[from] hanbridge_core::Error),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A persistent line-oriented connection to the HAN server.
///
/// ```text
///               ensure_connected() ok
/// Disconnected ───────────────────────> Connected
///      ^                                   │
///      └──── write failure / peer close ───┘
/// ```
pub trait LineTransport {
    /// Returns `true` while a connection is open.
    fn is_connected(&self) -> bool;

    /// Open a connection if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established. The
    /// transport stays disconnected.
    async fn ensure_connected(&mut self) -> Result<(), TransportError>;

    /// Write one command frame.
    ///
    /// # Errors
    ///
    /// Returns an error if not connected or if the write fails. A failed
    /// write leaves the transport disconnected.
    async fn send_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Wait for the next line or connection event.
    ///
    /// Never completes while disconnected. Cancel safe.
    async fn recv(&mut self) -> Incoming;

    /// Return whatever is available without waiting.
    fn poll_incoming(&mut self) -> Incoming {
        self.recv().now_or_never().unwrap_or(Incoming::Empty)
    }

    /// Close the connection. Safe to call when already disconnected.
    async fn close(&mut self) -> Result<(), TransportError>;
}
