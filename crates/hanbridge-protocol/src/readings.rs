//! Conversion of reply parameters into physical readings.
//!
//! Each HAN command has one decoder. A decoder checks the exact parameter
//! count for its command, applies the command's scaling, and returns a
//! [`Reading`] carrying both the formatted value reported on the bus and the
//! raw value used for change detection.
//!
//! Multi-byte quantities are little-endian:
//!
//! | Command | Params | Value |
//! |---------|--------|-------|
//! | GTMP | 5 | `i16[3..5] / p[1]` (integer) |
//! | GACD | 4 | `u16[0..2] / 10` or `u16[2..4] / 100` |
//! | GOUT | 3 | `p[2]` when `p[1] == 2` |
//! | GVLT | 8 | `u16[2..4] * u32[4..8] * 10^i8(p[1])` |
//! | GCUR | 8 | `i16[2..4] * u32[4..8] * 10^i8(p[1])` |
//! | GHUM | 6 | `i16[3..5] / p[1]` |
//! | GWSP | 6 | `u16[2..4] * 10^i8(p[1]) / u16[4..6]` km/h |
//! | GWDR | 3 | compass index `p[0]` |
//! | GRGC | 9 | `u16[2..4] * 10^i8(p[1]) * u32[5..9]` mm |
//!
//! # Example
//!
//! ```
//! use hanbridge_core::{HanCommand, Unit};
//! use hanbridge_protocol::readings;
//!
//! let reading = readings::decode(HanCommand::Gtmp, Unit::Celsius, &[0, 2, 0, 20, 0])
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(reading.current, "10");
//! assert_eq!(reading.units, Some("celsius"));
//! ```

use hanbridge_core::{
    Error, HanCommand, OutputLevel, Result, Unit,
    constants::{KMH_TO_MPH, MM_PER_INCH},
};
use tracing::{trace, warn};

use crate::GOUT_READ_STATUS;

/// Compass points indexed by the wind vane direction code.
///
/// The order follows the vane's resistor ladder, not the compass.
pub const COMPASS_POINTS: [&str; 16] = [
    "ese", "ene", "e", "sse", "se", "ssw", "s", "nne", "ne", "wsw", "sw", "nnw", "n", "wnw", "nw",
    "w",
];

/// Direction code reported when the vane input is shorted.
pub const WIND_DIR_SHORT: u8 = 0xFE;

/// Direction code reported when the vane input is open.
pub const WIND_DIR_OPEN: u8 = 0xFF;

/// Raw value compared between polls to decide whether a reading changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeKey {
    Int(i32),
    Float(f32),
}

/// One decoded reading, ready to be reported on the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Value of the `type` field (`temp`, `volts`, `output`, ...).
    pub quantity: &'static str,

    /// Value of the `device` field, when the command reports one.
    pub device: Option<String>,

    /// Formatted value of the `current` field.
    pub current: String,

    /// Value of the `units` field, when the command reports one.
    pub units: Option<&'static str>,

    pub change_key: ChangeKey,
}

impl Reading {
    fn sensor(quantity: &'static str, current: String, units: Option<&'static str>, key: ChangeKey) -> Self {
        Self {
            quantity,
            device: Some("0".to_string()),
            current,
            units,
            change_key: key,
        }
    }
}

/// Decode the parameters of a reply to `command` for a service using `unit`.
///
/// Returns `Ok(None)` for replies that carry no reading (a GOUT reply to a
/// write rather than a status read).
///
/// # Errors
///
/// - `Error::ParameterCount` if the parameter count is wrong for the command
/// - `Error::InvalidReading` if the value cannot be computed (zero divisor,
///   unexpected output state, unit the command cannot convert to)
pub fn decode(command: HanCommand, unit: Unit, params: &[u8]) -> Result<Option<Reading>> {
    expect_params(command, params)?;

    let reading = match command {
        HanCommand::Gtmp => temperature(unit, params)?,
        HanCommand::Gacd => ac_line(unit, params),
        HanCommand::Gout => return output(params),
        HanCommand::Gvlt => voltage(params),
        HanCommand::Gcur => current(params),
        HanCommand::Ghum => humidity(params)?,
        HanCommand::Gwsp => wind_speed(unit, params)?,
        HanCommand::Gwdr => wind_direction(params),
        HanCommand::Grgc => rain_gauge(unit, params)?,
    };

    Ok(Some(reading))
}

/// Exact number of reply parameters each command carries.
pub fn expected_params(command: HanCommand) -> usize {
    match command {
        HanCommand::Gtmp => 5,
        HanCommand::Gacd => 4,
        HanCommand::Gout => 3,
        HanCommand::Gvlt | HanCommand::Gcur => 8,
        HanCommand::Ghum | HanCommand::Gwsp => 6,
        HanCommand::Gwdr => 3,
        HanCommand::Grgc => 9,
    }
}

fn expect_params(command: HanCommand, params: &[u8]) -> Result<()> {
    let expected = expected_params(command);
    if params.len() != expected {
        return Err(Error::ParameterCount {
            command: command.to_string(),
            expected,
            actual: params.len(),
        });
    }
    Ok(())
}

fn invalid(command: HanCommand, reason: impl Into<String>) -> Error {
    Error::InvalidReading {
        command: command.to_string(),
        reason: reason.into(),
    }
}

fn le_u16(params: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([params[at], params[at + 1]])
}

fn le_i16(params: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([params[at], params[at + 1]])
}

fn le_u32(params: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([params[at], params[at + 1], params[at + 2], params[at + 3]])
}

fn pow10(exponent: u8) -> f32 {
    10f32.powi(i32::from(exponent as i8))
}

fn temperature(unit: Unit, params: &[u8]) -> Result<Reading> {
    let counts_per_unit = i32::from(params[1]);
    let raw = i32::from(le_i16(params, 3));
    trace!(raw, counts_per_unit, "GTMP raw values");

    if counts_per_unit == 0 {
        return Err(invalid(HanCommand::Gtmp, "zero counts per degree"));
    }

    let (value, label) = match unit {
        Unit::Celsius => (raw / counts_per_unit, "celsius"),
        Unit::Fahrenheit => ((9 * raw) / (5 * counts_per_unit) + 32, "fahrenheit"),
        other => return Err(invalid(HanCommand::Gtmp, format!("cannot convert to {other}"))),
    };

    Ok(Reading::sensor(
        "temp",
        value.to_string(),
        Some(label),
        ChangeKey::Int(value),
    ))
}

fn ac_line(unit: Unit, params: &[u8]) -> Reading {
    let volts = f32::from(le_u16(params, 0)) / 10.0;
    let hertz = f32::from(le_u16(params, 2)) / 100.0;
    trace!(volts, hertz, "GACD values");

    if unit == Unit::Volts {
        Reading {
            quantity: "volts",
            device: None,
            current: format!("{volts:.1}"),
            units: Some("volts"),
            change_key: ChangeKey::Float(volts),
        }
    } else {
        Reading {
            quantity: "frequency",
            device: None,
            current: format!("{hertz:.2}"),
            units: Some("hertz"),
            change_key: ChangeKey::Float(hertz),
        }
    }
}

fn output(params: &[u8]) -> Result<Option<Reading>> {
    if params[1] != GOUT_READ_STATUS {
        return Ok(None);
    }

    let level = match params[2] {
        0 => OutputLevel::Low,
        1 => OutputLevel::High,
        state => {
            return Err(invalid(
                HanCommand::Gout,
                format!("unexpected output state {state}"),
            ));
        }
    };

    Ok(Some(Reading {
        quantity: "output",
        device: Some(params[0].to_string()),
        current: level.as_str().to_string(),
        units: None,
        change_key: ChangeKey::Int(i32::from(params[2])),
    }))
}

fn voltage(params: &[u8]) -> Reading {
    let resolution = le_u32(params, 4) as f32;
    let raw = f32::from(le_u16(params, 2));
    let volts = raw * resolution * pow10(params[1]);
    trace!(volts, "GVLT value");

    Reading::sensor(
        "volts",
        format!("{volts:.3}"),
        Some("volts"),
        ChangeKey::Float(volts),
    )
}

fn current(params: &[u8]) -> Reading {
    let resolution = le_u32(params, 4) as f32;
    let raw = f32::from(le_i16(params, 2));
    let amps = raw * resolution * pow10(params[1]);
    trace!(amps, "GCUR value");

    Reading::sensor(
        "amps",
        format!("{amps:.3}"),
        Some("amps"),
        ChangeKey::Float(amps),
    )
}

fn humidity(params: &[u8]) -> Result<Reading> {
    let counts_per_unit = params[1];
    let raw = le_i16(params, 3);

    if params[5] != 0 {
        warn!(code = params[5], "Humidity sensor reports an error");
    }
    if counts_per_unit == 0 {
        return Err(invalid(HanCommand::Ghum, "zero counts per percent"));
    }

    let value = f32::from(raw) / f32::from(counts_per_unit);

    Ok(Reading::sensor(
        "humidity",
        format!("{value:.1}"),
        Some("%rh"),
        ChangeKey::Float(value),
    ))
}

fn wind_speed(unit: Unit, params: &[u8]) -> Result<Reading> {
    let mantissa = f32::from(le_u16(params, 2));
    let counts = le_u16(params, 4);

    if counts == 0 {
        return Err(invalid(HanCommand::Gwsp, "zero counts"));
    }

    let kmh = mantissa * pow10(params[1]) / f32::from(counts);
    let (value, label) = match unit {
        Unit::Kmh => (kmh, "kmh"),
        Unit::Mph => (kmh * KMH_TO_MPH, "mph"),
        other => return Err(invalid(HanCommand::Gwsp, format!("cannot convert to {other}"))),
    };

    Ok(Reading::sensor(
        "windspeed",
        format!("{value:.1}"),
        Some(label),
        ChangeKey::Float(value),
    ))
}

/// Compass point for a wind vane direction code.
pub fn compass_point(code: u8) -> &'static str {
    match code {
        0..=15 => COMPASS_POINTS[usize::from(code)],
        WIND_DIR_SHORT => "short",
        WIND_DIR_OPEN => "open",
        _ => "error",
    }
}

fn wind_direction(params: &[u8]) -> Reading {
    let code = params[0];

    Reading::sensor(
        "winddir",
        compass_point(code).to_string(),
        None,
        ChangeKey::Int(i32::from(code)),
    )
}

fn rain_gauge(unit: Unit, params: &[u8]) -> Result<Reading> {
    let mantissa = f32::from(le_u16(params, 2));
    let counts = le_u32(params, 5) as f32;
    let mm = mantissa * pow10(params[1]) * counts;

    let (value, label) = match unit {
        Unit::Millimeters => (mm, "mm."),
        Unit::Inches => (mm / MM_PER_INCH, "in."),
        other => return Err(invalid(HanCommand::Grgc, format!("cannot convert to {other}"))),
    };

    Ok(Reading::sensor(
        "raingauge",
        format!("{value:.3}"),
        Some(label),
        ChangeKey::Float(value),
    ))
}
