//! Scripted transport for testing the gateway without a HAN server.
//!
//! `MockTransport` records every frame written to it and replays lines that
//! a test pushes through its [`MockTransportHandle`]. Connect and write
//! failures can be switched on to exercise the fault paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

use crate::transport::{Incoming, LineTransport, TransportError};

/// Mock transport for tests.
///
/// # Examples
///
/// ```
/// use hanbridge_network::{Incoming, LineTransport, MockTransport};
///
/// #[tokio::main]
/// async fn main() {
///     let (mut transport, mut handle) = MockTransport::new();
///
///     transport.ensure_connected().await.unwrap();
///     transport.send_line("CA0A120000000000").await.unwrap();
///     assert_eq!(handle.sent(), vec!["CA0A120000000000".to_string()]);
///
///     handle.reply("RS0A120002140000");
///     assert_eq!(
///         transport.recv().await,
///         Incoming::Line("RS0A120002140000".to_string())
///     );
/// }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    connected: bool,
    incoming_rx: mpsc::UnboundedReceiver<Incoming>,
    sent_tx: mpsc::UnboundedSender<String>,
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    fail_connect: AtomicBool,
    fail_write: AtomicBool,
    connects: AtomicUsize,
}

impl MockTransport {
    /// Create a disconnected mock and the handle that drives it.
    pub fn new() -> (Self, MockTransportHandle) {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());

        let transport = Self {
            connected: false,
            incoming_rx,
            sent_tx,
            shared: Arc::clone(&shared),
        };

        let handle = MockTransportHandle {
            incoming_tx,
            sent_rx,
            shared,
        };

        (transport, handle)
    }
}

impl LineTransport for MockTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn ensure_connected(&mut self) -> Result<(), TransportError> {
        if self.connected {
            return Ok(());
        }
        if self.shared.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionLost("connection refused".to_string()));
        }
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        self.connected = true;
        Ok(())
    }

    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if self.shared.fail_write.load(Ordering::SeqCst) {
            self.connected = false;
            return Err(TransportError::ConnectionLost("broken pipe".to_string()));
        }
        // The handle may have been dropped; the frame is simply not recorded.
        let _ = self.sent_tx.send(line.to_string());
        Ok(())
    }

    async fn recv(&mut self) -> Incoming {
        if !self.connected {
            return std::future::pending().await;
        }
        match self.incoming_rx.recv().await {
            Some(incoming) => {
                if matches!(incoming, Incoming::Closed | Incoming::Error(_)) {
                    self.connected = false;
                }
                incoming
            }
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        Ok(())
    }
}

/// Handle for scripting a [`MockTransport`].
#[derive(Debug)]
pub struct MockTransportHandle {
    incoming_tx: mpsc::UnboundedSender<Incoming>,
    sent_rx: mpsc::UnboundedReceiver<String>,
    shared: Arc<Shared>,
}

impl MockTransportHandle {
    /// Queue a line as if the HAN server had sent it.
    pub fn reply(&self, line: impl Into<String>) {
        let _ = self.incoming_tx.send(Incoming::Line(line.into()));
    }

    /// Simulate the HAN server closing the connection.
    pub fn close_peer(&self) {
        let _ = self.incoming_tx.send(Incoming::Closed);
    }

    /// Drain the frames written since the last call.
    pub fn sent(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.sent_rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    pub fn set_connect_failure(&self, fail: bool) {
        self.shared.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_write_failure(&self, fail: bool) {
        self.shared.fail_write.store(fail, Ordering::SeqCst);
    }

    /// Number of successful connects so far.
    pub fn connect_count(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }
}
