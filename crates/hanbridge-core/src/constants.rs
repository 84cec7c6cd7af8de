//! Core constants for the HAN protocol implementation.
//!
//! This module defines the protocol-level constants shared by the encoder,
//! the reply decoder and the gateway engine.
//!
//! # Protocol Structure
//!
//! Commands and replies are ASCII hex text, one frame per line:
//!
//! ```text
//! CA AA CC <params...>     command   (gateway -> HAN server)
//! RS AA CC <params...>     reply     (HAN server -> gateway)
//! ```
//!
//! Where:
//! - `CA` / `RS` - Command prefix / reply marker
//! - `AA` - HAN bus address (two hex digits)
//! - `CC` - Command code (two hex digits)
//! - `<params...>` - Command specific parameter bytes, two hex digits each
//!
//! # Usage
//!
//! ```
//! use hanbridge_core::constants::*;
//!
//! assert_eq!(COMMAND_PREFIX, "CA");
//! assert_eq!(REPLY_MARKER, "RS");
//!
//! fn is_reply(line: &str) -> bool {
//!     line.starts_with(REPLY_MARKER)
//! }
//! assert!(is_reply("RS0A130001"));
//! ```

// ============================================================================
// Framing
// ============================================================================

/// Prefix of every command frame sent to the HAN server.
pub const COMMAND_PREFIX: &str = "CA";

/// Two character marker that starts every reply line.
///
/// Lines that do not begin with this marker are ignored.
pub const REPLY_MARKER: &str = "RS";

/// Length of the reply header: marker, address pair and command pair.
///
/// ```text
/// RS 0A 13 ...
/// ^^^^^^^^
/// 6 characters
/// ```
pub const REPLY_HEADER_LEN: usize = 6;

/// Maximum number of parameter bytes in a reply frame.
pub const MAX_RESPONSE_PARAMS: usize = 16;

/// Size of the working line buffer for incoming replies.
///
/// A line that grows beyond this without a newline is a protocol error and
/// the partial line is discarded.
pub const MAX_LINE_LENGTH: usize = 256;

// ============================================================================
// Addressing
// ============================================================================

/// Highest valid HAN bus address.
pub const MAX_ADDRESS: u8 = 254;

/// Highest valid channel (sub-address).
pub const MAX_CHANNEL: u8 = 15;

/// Highest device index accepted in a GOUT bus request.
pub const MAX_HAN_DEVICE: u32 = 16;

// ============================================================================
// Polling
// ============================================================================

/// Longest polling interval in seconds (one week).
pub const MAX_POLL_INTERVAL: u32 = 604_800;

/// Default scheduler tick period in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Default time a request may stay in flight before it is abandoned.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 5000;

// ============================================================================
// Connection
// ============================================================================

/// Default HAN server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default HAN server port.
pub const DEFAULT_PORT: u16 = 1129;

/// Default connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;

// ============================================================================
// Bus schema
// ============================================================================

/// Schema class of every event published by the gateway.
pub const EVENT_SCHEMA_CLASS: &str = "sensor";

/// Schema type of every event published by the gateway.
pub const EVENT_SCHEMA_TYPE: &str = "basic";

/// Service class that marks a service as a sensor.
pub const SENSOR_CLASS: &str = "sensor";

/// The only `request` value supported by read commands.
pub const REQUEST_CURRENT: &str = "current";

// ============================================================================
// Unit conversion
// ============================================================================

/// Kilometres per hour to miles per hour.
pub const KMH_TO_MPH: f32 = 0.621371;

/// Millimetres per inch.
pub const MM_PER_INCH: f32 = 25.4;
