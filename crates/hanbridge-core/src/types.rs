use crate::{
    Result,
    constants::{MAX_ADDRESS, MAX_CHANNEL},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// HAN bus address (0-254)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(u8);

impl Address {
    /// Create a new address with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidAddress` if the address is above 254.
    pub fn new(address: u32) -> Result<Self> {
        if address > u32::from(MAX_ADDRESS) {
            return Err(Error::InvalidAddress {
                value: address.to_string(),
            });
        }
        Ok(Address(address as u8))
    }

    /// Get the raw address as u8.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = parse_decimal(s).ok_or_else(|| Error::InvalidAddress {
            value: s.to_string(),
        })?;
        Address::new(value)
    }
}

/// Channel (sub-address) on a HAN node (0-15)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel(u8);

impl Channel {
    /// Create a new channel with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidChannel` if the channel is above 15.
    pub fn new(channel: u32) -> Result<Self> {
        if channel > u32::from(MAX_CHANNEL) {
            return Err(Error::InvalidChannel {
                value: channel.to_string(),
            });
        }
        Ok(Channel(channel as u8))
    }

    /// Get the raw channel as u8.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

/// Parse an all-digit decimal string.
///
/// Signs, whitespace and hex prefixes are rejected so that `"+1"` or `" 1"`
/// never pass as a valid number.
pub fn parse_decimal(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Physical units a sensor service can report in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Fahrenheit,
    Celsius,
    Volts,
    Amps,
    Hertz,
    Output,
    PercentRh,
    Mph,
    Kmh,
    WindDirMap,
    Inches,
    Millimeters,
}

/// Units keyword map (keyword used in service definitions).
pub const UNITS_MAP: [(Unit, &str); 12] = [
    (Unit::Fahrenheit, "fahrenheit"),
    (Unit::Celsius, "celsius"),
    (Unit::Volts, "volts"),
    (Unit::Amps, "amps"),
    (Unit::Hertz, "hertz"),
    (Unit::Output, "output"),
    (Unit::PercentRh, "%rh"),
    (Unit::Mph, "mph"),
    (Unit::Kmh, "kmh"),
    (Unit::WindDirMap, "wdirmap"),
    (Unit::Inches, "in."),
    (Unit::Millimeters, "mm."),
];

impl Unit {
    /// Look a unit up by its keyword.
    ///
    /// # Errors
    /// Returns `Error::UnknownUnit` for keywords not in [`UNITS_MAP`].
    pub fn parse(keyword: &str) -> Result<Self> {
        UNITS_MAP
            .iter()
            .find(|(_, kw)| *kw == keyword)
            .map(|(unit, _)| *unit)
            .ok_or_else(|| Error::UnknownUnit {
                keyword: keyword.to_string(),
            })
    }

    pub fn keyword(&self) -> &'static str {
        UNITS_MAP
            .iter()
            .find(|(unit, _)| unit == self)
            .map(|(_, kw)| *kw)
            .unwrap_or("")
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// HAN device commands understood by the gateway.
///
/// The discriminant is the command code carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HanCommand {
    /// Temperature
    Gtmp = 0x12,
    /// Digital output (read or drive)
    Gout = 0x13,
    /// AC line voltage and frequency
    Gacd = 0x15,
    /// DC voltage
    Gvlt = 0x16,
    /// DC current
    Gcur = 0x17,
    /// Relative humidity
    Ghum = 0x30,
    /// Wind speed
    Gwsp = 0x31,
    /// Wind direction
    Gwdr = 0x32,
    /// Rain gauge
    Grgc = 0x33,
}

/// One row of the command map: code, keyword and the units it can report.
#[derive(Debug, Clone, Copy)]
pub struct CommandMapEntry {
    pub command: HanCommand,
    pub keyword: &'static str,
    pub valid_units: &'static [Unit],
}

/// Command keyword map.
///
/// The first valid unit of each row is the unit used when a non-sensor
/// service does not name one.
pub const COMMAND_MAP: [CommandMapEntry; 9] = [
    CommandMapEntry {
        command: HanCommand::Gtmp,
        keyword: "gtmp",
        valid_units: &[Unit::Fahrenheit, Unit::Celsius],
    },
    CommandMapEntry {
        command: HanCommand::Gacd,
        keyword: "gacd",
        valid_units: &[Unit::Volts, Unit::Hertz],
    },
    CommandMapEntry {
        command: HanCommand::Gout,
        keyword: "gout",
        valid_units: &[Unit::Output],
    },
    CommandMapEntry {
        command: HanCommand::Gvlt,
        keyword: "gvlt",
        valid_units: &[Unit::Volts],
    },
    CommandMapEntry {
        command: HanCommand::Gcur,
        keyword: "gcur",
        valid_units: &[Unit::Amps],
    },
    CommandMapEntry {
        command: HanCommand::Ghum,
        keyword: "ghum",
        valid_units: &[Unit::PercentRh],
    },
    CommandMapEntry {
        command: HanCommand::Gwsp,
        keyword: "gwsp",
        valid_units: &[Unit::Mph, Unit::Kmh],
    },
    CommandMapEntry {
        command: HanCommand::Gwdr,
        keyword: "gwdr",
        valid_units: &[Unit::WindDirMap],
    },
    CommandMapEntry {
        command: HanCommand::Grgc,
        keyword: "grgc",
        valid_units: &[Unit::Inches, Unit::Millimeters],
    },
];

impl HanCommand {
    /// Look a command up by its configuration keyword (e.g. `"gtmp"`).
    ///
    /// # Errors
    /// Returns `Error::UnknownCommand` for keywords not in [`COMMAND_MAP`].
    pub fn parse(keyword: &str) -> Result<Self> {
        COMMAND_MAP
            .iter()
            .find(|entry| entry.keyword == keyword)
            .map(|entry| entry.command)
            .ok_or_else(|| Error::UnknownCommand {
                keyword: keyword.to_string(),
            })
    }

    /// Map a wire command code back to a command.
    pub fn from_code(code: u8) -> Option<Self> {
        COMMAND_MAP
            .iter()
            .map(|entry| entry.command)
            .find(|command| command.code() == code)
    }

    #[inline]
    pub fn code(&self) -> u8 {
        *self as u8
    }

    fn entry(&self) -> &'static CommandMapEntry {
        // Every variant has exactly one row in COMMAND_MAP.
        match self {
            HanCommand::Gtmp => &COMMAND_MAP[0],
            HanCommand::Gacd => &COMMAND_MAP[1],
            HanCommand::Gout => &COMMAND_MAP[2],
            HanCommand::Gvlt => &COMMAND_MAP[3],
            HanCommand::Gcur => &COMMAND_MAP[4],
            HanCommand::Ghum => &COMMAND_MAP[5],
            HanCommand::Gwsp => &COMMAND_MAP[6],
            HanCommand::Gwdr => &COMMAND_MAP[7],
            HanCommand::Grgc => &COMMAND_MAP[8],
        }
    }

    pub fn keyword(&self) -> &'static str {
        self.entry().keyword
    }

    pub fn valid_units(&self) -> &'static [Unit] {
        self.entry().valid_units
    }

    /// Unit used when a service does not name one.
    pub fn default_unit(&self) -> Unit {
        self.valid_units()[0]
    }

    /// Returns `true` if `unit` is in this command's valid-units set.
    pub fn accepts_unit(&self, unit: Unit) -> bool {
        self.valid_units().contains(&unit)
    }
}

impl fmt::Display for HanCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.keyword().to_ascii_uppercase())
    }
}

/// Requested level of a GOUT output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum OutputLevel {
    Low = 0,
    High = 1,
}

impl OutputLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(OutputLevel::Low),
            "high" => Some(OutputLevel::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputLevel::Low => "low",
            OutputLevel::High => "high",
        }
    }
}
