use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (fatal at start-up)
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing configuration key '{key}' in service {service}")]
    MissingConfig { service: String, key: String },

    #[error("Unrecognized han-command: {keyword}")]
    UnknownCommand { keyword: String },

    #[error("Unrecognized units: {keyword}")]
    UnknownUnit { keyword: String },

    #[error("Address must be between 0 and 254, got {value}")]
    InvalidAddress { value: String },

    #[error("Channel must be between 0 and 15, got {value}")]
    InvalidChannel { value: String },

    #[error("Instance {instance} fails sanity check of han command {command} to units {unit}")]
    UnitMismatch {
        instance: String,
        command: String,
        unit: String,
    },

    #[error("Duplicate {what}: {value}")]
    Duplicate { what: &'static str, value: String },

    // Bus request errors
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Unsupported request: {0}")]
    UnsupportedRequest(String),

    // HAN reply errors
    #[error("Malformed frame: {message}")]
    MalformedFrame { message: String },

    #[error("Unknown response code: {code:#04x}")]
    UnknownResponseCode { code: u8 },

    #[error("{command}: received an incorrect number of parameters, got {actual}, need {expected}")]
    ParameterCount {
        command: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid reading from {command}: {reason}")]
    InvalidReading { command: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new malformed frame error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }

    /// Create a new invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors that must stop the process at start-up.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::MissingConfig { .. }
                | Self::UnknownCommand { .. }
                | Self::UnknownUnit { .. }
                | Self::InvalidAddress { .. }
                | Self::InvalidChannel { .. }
                | Self::UnitMismatch { .. }
                | Self::Duplicate { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
