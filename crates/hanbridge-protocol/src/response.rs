//! Reply frame decoding for the HAN protocol.
//!
//! A reply line starts with the two character marker `RS`, followed by hex
//! pairs:
//!
//! ```text
//! RS 0A 13 01 02 01
//!    ^^ ^^ ^^^^^^^^
//!    |  |  parameters ((len - 6) / 2 of them, at most 16)
//!    |  command code
//!    address
//! ```
//!
//! Lines without the marker are not replies and are ignored by the caller.
//!
//! # Example
//!
//! ```
//! use hanbridge_protocol::ResponseFrame;
//!
//! let frame = ResponseFrame::parse("RS0A13010201").unwrap().unwrap();
//! assert_eq!(frame.address, 0x0A);
//! assert_eq!(frame.command, 0x13);
//! assert_eq!(frame.params(), &[0x01, 0x02, 0x01]);
//!
//! assert!(ResponseFrame::parse("OK").unwrap().is_none());
//! ```

use hanbridge_core::{
    Error, HanCommand, Result,
    constants::{MAX_RESPONSE_PARAMS, REPLY_HEADER_LEN, REPLY_MARKER},
};
use std::fmt;

/// A decoded HAN reply: address, command code and parameter bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub address: u8,
    pub command: u8,
    params: Vec<u8>,
}

impl ResponseFrame {
    pub fn new(address: u8, command: u8, params: Vec<u8>) -> Self {
        Self {
            address,
            command,
            params,
        }
    }

    /// Parse one reply line.
    ///
    /// Returns `Ok(None)` if the line does not start with the reply marker.
    /// A trailing odd character is ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedFrame` if the line is shorter than the
    /// header, contains a non-hex pair, or carries more than 16 parameters.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim_end_matches(['\r', '\n']);
        if !line.starts_with(REPLY_MARKER) {
            return Ok(None);
        }
        if !line.is_ascii() {
            return Err(Error::malformed(format!("non-ASCII reply: {line:?}")));
        }
        if line.len() < REPLY_HEADER_LEN {
            return Err(Error::malformed(format!("reply too short: {line}")));
        }

        let address = hex_pair(line, 2)?;
        let command = hex_pair(line, 4)?;

        let count = (line.len() - REPLY_HEADER_LEN) / 2;
        if count > MAX_RESPONSE_PARAMS {
            return Err(Error::malformed(format!(
                "{count} parameters, at most {MAX_RESPONSE_PARAMS} allowed"
            )));
        }

        let params = (0..count)
            .map(|i| hex_pair(line, REPLY_HEADER_LEN + 2 * i))
            .collect::<Result<Vec<u8>>>()?;

        Ok(Some(Self::new(address, command, params)))
    }

    pub fn params(&self) -> &[u8] {
        &self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// The command this reply answers, if the code is one we know.
    pub fn han_command(&self) -> Option<HanCommand> {
        HanCommand::from_code(self.command)
    }
}

impl fmt::Display for ResponseFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{REPLY_MARKER}{:02X}{:02X}", self.address, self.command)?;
        for p in &self.params {
            write!(f, "{p:02X}")?;
        }
        Ok(())
    }
}

fn hex_pair(line: &str, at: usize) -> Result<u8> {
    let pair = &line[at..at + 2];
    // from_str_radix would also take a leading '+'
    if !pair.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::malformed(format!(
            "invalid hex pair '{pair}' at offset {at}"
        )));
    }
    u8::from_str_radix(pair, 16)
        .map_err(|_| Error::malformed(format!("invalid hex pair '{pair}' at offset {at}")))
}
