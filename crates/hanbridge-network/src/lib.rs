//! Network layer for the HAN gateway
//!
//! This crate owns the single connection to the HAN server. The gateway
//! engine is generic over [`LineTransport`]; [`TcpTransport`] is the real
//! implementation and [`MockTransport`] a scripted one for tests.
//!
//! # Example
//!
//! ```no_run
//! use hanbridge_network::{LineTransport, TcpTransport, TcpTransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TcpTransportConfig {
//!     host: "127.0.0.1".to_string(),
//!     port: 1129,
//!     ..Default::default()
//! };
//!
//! let mut transport = TcpTransport::new(config);
//! transport.ensure_connected().await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod mock;
pub mod transport;

pub use client::{TcpTransport, TcpTransportConfig};
pub use mock::{MockTransport, MockTransportHandle};
pub use transport::{Incoming, LineTransport, TransportError};
