//! TCP transport to the HAN server.
//!
//! The HAN server is a serial-to-TCP bridge. The gateway keeps one
//! connection open, writes one command frame at a time and reads reply
//! lines through [`HanCodec`].
//!
//! ```text
//! Gateway engine
//!     │
//!     └─> TcpTransport ───(TCP)───> HAN server ───(RS-485)───> nodes
//!            │
//!            └─> HanCodec (line framing)
//! ```
//!
//! The transport does not retry. A failed connect, a failed write or a
//! peer close leaves it disconnected, and the next `ensure_connected()`
//! opens a fresh connection.
//!
//! # Example Usage
//!
//! ```no_run
//! use hanbridge_network::{LineTransport, TcpTransport, TcpTransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut transport = TcpTransport::new(TcpTransportConfig::default());
//! transport.ensure_connected().await?;
//! transport.send_line("CA0A120000000000").await?;
//!
//! let reply = transport.recv().await;
//! println!("Received: {:?}", reply);
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use futures::{SinkExt, StreamExt};
use hanbridge_core::constants::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_PORT};
use hanbridge_protocol::HanCodec;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, trace, warn};

use crate::transport::{Incoming, LineTransport, TransportError};

/// Configuration for the TCP transport
///
/// # Example
///
/// ```
/// use hanbridge_network::TcpTransportConfig;
/// use std::time::Duration;
///
/// let config = TcpTransportConfig {
///     host: "hanserver.lan".to_string(),
///     connect_timeout: Duration::from_millis(5000),
///     ..Default::default()
/// };
/// assert_eq!(config.port, 1129);
/// ```
#[derive(Debug, Clone)]
pub struct TcpTransportConfig {
    /// Host name or IP address of the HAN server
    pub host: String,

    /// TCP port of the HAN server
    pub port: u16,

    /// Timeout for opening a connection
    pub connect_timeout: Duration,

    /// Timeout for writing one frame
    pub write_timeout: Duration,

    /// Appended to every outbound frame
    pub line_ending: String,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            write_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            line_ending: String::new(),
        }
    }
}

/// TCP connection to the HAN server
///
/// # Connection Lifecycle
///
/// 1. Create transport with `new()` (not connected)
/// 2. `ensure_connected()` before each send
/// 3. `send_line()` / `recv()`
/// 4. `close()` on shutdown
pub struct TcpTransport {
    config: TcpTransportConfig,

    /// Framed TCP stream (None if not connected)
    framed: Option<Framed<TcpStream, HanCodec>>,
}

impl TcpTransport {
    /// Create a new transport. No connection is opened yet.
    ///
    /// ```
    /// use hanbridge_network::{LineTransport, TcpTransport, TcpTransportConfig};
    ///
    /// let transport = TcpTransport::new(TcpTransportConfig::default());
    /// assert!(!transport.is_connected());
    /// ```
    pub fn new(config: TcpTransportConfig) -> Self {
        debug!(host = %config.host, port = config.port, "Creating HAN transport");

        Self {
            config,
            framed: None,
        }
    }

    pub fn config(&self) -> &TcpTransportConfig {
        &self.config
    }

    fn teardown(&mut self) {
        if self.framed.take().is_some() {
            debug!("HAN connection dropped");
        }
    }

    fn timeout_ms(timeout: Duration) -> u64 {
        timeout.as_millis() as u64
    }
}

impl LineTransport for TcpTransport {
    fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    async fn ensure_connected(&mut self) -> Result<(), TransportError> {
        if self.framed.is_some() {
            return Ok(());
        }

        let host = self.config.host.as_str();
        let port = self.config.port;
        info!(host, port, "Connecting to HAN server");

        let stream = match tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect((host, port)),
        )
        .await
        {
            Ok(Ok(stream)) => {
                info!(host, port, "Connected to HAN server");
                stream
            }
            Ok(Err(e)) => {
                error!(host, port, "Connection failed: {}", e);
                return Err(e.into());
            }
            Err(_) => {
                warn!(
                    "Connection timeout after {}ms",
                    self.config.connect_timeout.as_millis()
                );
                return Err(TransportError::ConnectionTimeout(Self::timeout_ms(
                    self.config.connect_timeout,
                )));
            }
        };

        // Frames are tiny and each one waits for a reply.
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        self.framed = Some(Framed::new(
            stream,
            HanCodec::with_line_ending(self.config.line_ending.clone()),
        ));

        Ok(())
    }

    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        let framed = self.framed.as_mut().ok_or(TransportError::NotConnected)?;
        trace!(frame = line, "-> HAN");

        let result = match tokio::time::timeout(
            self.config.write_timeout,
            framed.send(line.to_string()),
        )
        .await
        {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(hanbridge_core::Error::Io(e))) => {
                warn!("Failed to write frame: {}", e);
                Err(TransportError::ConnectionLost(e.to_string()))
            }
            Ok(Err(e)) => {
                warn!("Frame rejected: {}", e);
                Err(TransportError::Protocol(e))
            }
            Err(_) => {
                warn!(
                    "Write timeout after {}ms",
                    self.config.write_timeout.as_millis()
                );
                Err(TransportError::WriteTimeout(Self::timeout_ms(
                    self.config.write_timeout,
                )))
            }
        };

        self.teardown();
        result
    }

    async fn recv(&mut self) -> Incoming {
        let Some(framed) = self.framed.as_mut() else {
            return std::future::pending().await;
        };

        let incoming = match framed.next().await {
            Some(Ok(line)) => {
                trace!(line = %line, "<- HAN");
                return Incoming::Line(line);
            }
            Some(Err(e)) => {
                warn!("Read from HAN server failed: {}", e);
                Incoming::Error(e.to_string())
            }
            None => {
                warn!("Connection closed by HAN server");
                Incoming::Closed
            }
        };

        self.teardown();
        incoming
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut framed) = self.framed.take() {
            info!(host = %self.config.host, "Closing HAN connection");

            // Flush with timeout to prevent hanging on network issues
            let flush_timeout = Duration::from_millis(500);
            match tokio::time::timeout(flush_timeout, framed.flush()).await {
                Ok(Ok(())) => {
                    debug!("Flush completed successfully");
                }
                Ok(Err(e)) => {
                    warn!("Error flushing during close: {}", e);
                }
                Err(_) => {
                    warn!(
                        "Flush timeout during close ({}ms)",
                        flush_timeout.as_millis()
                    );
                }
            }

            let mut stream = framed.into_inner();
            let shutdown_timeout = Duration::from_millis(500);
            match tokio::time::timeout(shutdown_timeout, stream.shutdown()).await {
                Ok(Ok(())) => {
                    debug!("Shutdown completed successfully");
                }
                Ok(Err(e)) => {
                    warn!("Error during shutdown: {}", e);
                }
                Err(_) => {
                    warn!(
                        "Shutdown timeout during close ({}ms)",
                        shutdown_timeout.as_millis()
                    );
                }
            }
        }

        Ok(())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.framed.is_some() {
            debug!("TcpTransport dropped while connected - connection will be closed");
        }
    }
}
