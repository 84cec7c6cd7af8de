//! Command frame encoding for the HAN protocol.
//!
//! Every command is a fixed-length line of uppercase ASCII hex:
//!
//! ```text
//! CA AA CC <command specific bytes>
//! ```
//!
//! The zero-fill after the address and command code is part of the device
//! protocol and must be reproduced exactly; each command type has its own
//! frame length.
//!
//! | Command | Frame |
//! |---------|-------|
//! | GOUT | `CA AA CC HH SS 00` |
//! | GACD | `CA AA CC 00 00 00 00` |
//! | GTMP | `CA AA CC HH 00 00 00 00` |
//! | GVLT, GCUR | `CA AA CC 00 x8` |
//! | GHUM | `CA AA CC HH 00 x5` |
//! | GWSP | `CA AA CC hh 00 x5` (channel in lowercase hex) |
//! | GWDR | `CA AA CC 00 00 00` |
//! | GRGC | `CA AA CC 00 x4 HH 00 x4` |
//!
//! # Example
//!
//! ```
//! use hanbridge_core::{Address, Channel, HanCommand, OutputLevel};
//! use hanbridge_protocol::{HanRequest, encode};
//!
//! let frame = encode(
//!     HanCommand::Gout,
//!     Address::new(0x0A).unwrap(),
//!     Channel::new(1).unwrap(),
//!     HanRequest::SetOutput(OutputLevel::High),
//! )
//! .unwrap();
//! assert_eq!(frame, "CA0A13010100");
//! ```

use hanbridge_core::{
    Address, Channel, Error, HanCommand, OutputLevel, Result, constants::COMMAND_PREFIX,
};

/// GOUT subcommand asking the node to report the output state.
pub const GOUT_READ_STATUS: u8 = 2;

/// What a command frame asks the node to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HanRequest {
    /// Read the current value (every command supports this).
    Read,
    /// Drive a GOUT output low or high.
    SetOutput(OutputLevel),
}

impl HanRequest {
    /// GOUT subcommand byte for this request.
    fn subcommand(&self) -> u8 {
        match self {
            HanRequest::Read => GOUT_READ_STATUS,
            HanRequest::SetOutput(level) => *level as u8,
        }
    }
}

/// Build the command frame for `command` addressed to `address`/`channel`.
///
/// # Errors
///
/// Returns `Error::UnsupportedRequest` when a write is requested for a
/// read-only command.
pub fn encode(
    command: HanCommand,
    address: Address,
    channel: Channel,
    request: HanRequest,
) -> Result<String> {
    if matches!(request, HanRequest::SetOutput(_)) && command != HanCommand::Gout {
        return Err(Error::UnsupportedRequest(format!(
            "{command} is read-only"
        )));
    }

    let head = format!(
        "{COMMAND_PREFIX}{:02X}{:02X}",
        address.as_u8(),
        command.code()
    );
    let ch = channel.as_u8();

    let frame = match command {
        HanCommand::Gout => format!("{head}{ch:02X}{:02X}00", request.subcommand()),
        HanCommand::Gacd => format!("{head}00000000"),
        HanCommand::Gtmp => format!("{head}{ch:02X}00000000"),
        HanCommand::Gvlt | HanCommand::Gcur => format!("{head}0000000000000000"),
        HanCommand::Ghum => format!("{head}{ch:02X}0000000000"),
        // The wind speed node expects its channel byte in lowercase.
        HanCommand::Gwsp => format!("{head}{ch:02x}0000000000"),
        HanCommand::Gwdr => format!("{head}000000"),
        HanCommand::Grgc => format!("{head}00000000{ch:02X}00000000"),
    };

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn addr(a: u32) -> Address {
        Address::new(a).unwrap()
    }

    fn chan(c: u32) -> Channel {
        Channel::new(c).unwrap()
    }

    #[rstest]
    #[case(HanCommand::Gout, "CA0A13010200")]
    #[case(HanCommand::Gacd, "CA0A1500000000")]
    #[case(HanCommand::Gtmp, "CA0A120100000000")]
    #[case(HanCommand::Gvlt, "CA0A160000000000000000")]
    #[case(HanCommand::Gcur, "CA0A170000000000000000")]
    #[case(HanCommand::Ghum, "CA0A30010000000000")]
    #[case(HanCommand::Gwsp, "CA0A31010000000000")]
    #[case(HanCommand::Gwdr, "CA0A32000000")]
    #[case(HanCommand::Grgc, "CA0A33000000000100000000")]
    fn test_read_frames(#[case] command: HanCommand, #[case] expected: &str) {
        let frame = encode(command, addr(0x0A), chan(1), HanRequest::Read).unwrap();
        assert_eq!(frame, expected);
    }

    #[test]
    fn test_gout_write_frames() {
        let high = encode(
            HanCommand::Gout,
            addr(0x0A),
            chan(1),
            HanRequest::SetOutput(OutputLevel::High),
        )
        .unwrap();
        assert_eq!(high, "CA0A13010100");

        let low = encode(
            HanCommand::Gout,
            addr(0x0A),
            chan(1),
            HanRequest::SetOutput(OutputLevel::Low),
        )
        .unwrap();
        assert_eq!(low, "CA0A13010000");
    }

    #[test]
    fn test_gwsp_channel_is_lowercase() {
        let frame = encode(HanCommand::Gwsp, addr(0xAB), chan(0x0C), HanRequest::Read).unwrap();
        assert_eq!(frame, "CAAB310c0000000000");

        let ghum = encode(HanCommand::Ghum, addr(0xAB), chan(0x0C), HanRequest::Read).unwrap();
        assert_eq!(ghum, "CAAB300C0000000000");
    }

    #[test]
    fn test_grgc_channel_mid_frame() {
        let frame = encode(HanCommand::Grgc, addr(254), chan(15), HanRequest::Read).unwrap();
        assert_eq!(&frame[..6], "CAFE33");
        assert_eq!(&frame[14..16], "0F");
        assert_eq!(frame.len(), 24);
    }

    #[test]
    fn test_channel_ignored_where_not_in_template() {
        let a = encode(HanCommand::Gwdr, addr(1), chan(0), HanRequest::Read).unwrap();
        let b = encode(HanCommand::Gwdr, addr(1), chan(9), HanRequest::Read).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_write_to_read_only_command_rejected() {
        let result = encode(
            HanCommand::Gtmp,
            addr(1),
            chan(0),
            HanRequest::SetOutput(OutputLevel::High),
        );
        assert!(matches!(result, Err(Error::UnsupportedRequest(_))));
    }
}
