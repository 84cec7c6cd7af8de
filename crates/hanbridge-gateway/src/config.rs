//! Gateway configuration.
//!
//! The file format is owned by the binary; this module only defines the
//! deserialized shape and its defaults. A minimal TOML file:
//!
//! ```toml
//! host = "hanserver.lan"
//!
//! [[service]]
//! name = "porch"
//! instance = "porch-temp"
//! address = 32
//! class = "sensor"
//! type = "basic"
//! han-command = "gtmp"
//! units = "celsius"
//! polling-interval = 60
//! ```

use hanbridge_core::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RESPONSE_TIMEOUT_MS,
    DEFAULT_TICK_INTERVAL_MS,
};
use hanbridge_core::{Error, Result};
use hanbridge_network::TcpTransportConfig;
use serde::Deserialize;
use std::time::Duration;

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GatewayConfig {
    /// HAN server host name or address
    pub host: String,

    /// HAN server TCP port
    pub port: u16,

    /// How long a sent command may wait for its reply
    pub response_timeout_ms: u64,

    /// Scheduler tick period
    pub tick_interval_ms: u64,

    pub connect_timeout_ms: u64,

    /// Appended to every command frame (empty by default)
    pub line_ending: String,

    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,

    #[serde(rename = "service")]
    pub services: Vec<ServiceDefinition>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            line_ending: String::new(),
            log_level: "info".to_string(),
            services: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Check the gateway-wide settings.
    ///
    /// Service definitions are checked by the registry.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a zero tick interval or an empty service
    /// list.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::config("tick-interval-ms must be greater than 0"));
        }
        if self.services.is_empty() {
            return Err(Error::config("At least one service must be defined"));
        }
        Ok(())
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Settings for the TCP connection to the HAN server.
    pub fn transport_config(&self) -> TcpTransportConfig {
        TcpTransportConfig {
            host: self.host.clone(),
            port: self.port,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            write_timeout: Duration::from_millis(self.connect_timeout_ms),
            line_ending: self.line_ending.clone(),
        }
    }
}

/// One configured service, as written in the configuration file.
///
/// Fields are optional here so that a missing key is reported by the
/// registry with the service name rather than as a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceDefinition {
    pub name: String,

    /// Instance ID the service answers to on the bus
    pub instance: String,

    pub address: Option<u32>,

    pub class: Option<String>,

    #[serde(rename = "type")]
    pub service_type: Option<String>,

    pub han_command: Option<String>,

    pub units: Option<String>,

    /// Seconds between polls; sensors only
    pub polling_interval: Option<u32>,

    pub channel: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1129);
        assert_eq!(config.response_timeout(), Duration::from_secs(5));
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert!(config.line_ending.is_empty());
        assert!(config.services.is_empty());
    }

    #[test]
    fn test_validate_rejects_zero_tick_interval() {
        let config: GatewayConfig = toml::from_str(
            r#"
            tick-interval-ms = 0

            [[service]]
            name = "porch"
            instance = "porch-temp"
            "#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("tick-interval-ms"));
    }

    #[test]
    fn test_validate_requires_a_service() {
        let config: GatewayConfig = toml::from_str("host = \"hanserver.lan\"").unwrap();
        assert!(matches!(config.validate(), Err(Error::Config { .. })));

        let mut config = config;
        config.services.push(ServiceDefinition {
            name: "porch".to_string(),
            instance: "porch-temp".to_string(),
            ..Default::default()
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            host = "hanserver.lan"
            line-ending = "\n"

            [[service]]
            name = "porch"
            instance = "porch-temp"
            address = 32
            class = "sensor"
            type = "basic"
            han-command = "gtmp"
            units = "celsius"
            polling-interval = 60

            [[service]]
            name = "lamp"
            instance = "lamp"
            address = 10
            class = "control"
            type = "basic"
            han-command = "gout"
            channel = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.host, "hanserver.lan");
        assert_eq!(config.port, 1129);
        assert_eq!(config.line_ending, "\n");
        assert_eq!(config.services.len(), 2);

        let porch = &config.services[0];
        assert_eq!(porch.address, Some(32));
        assert_eq!(porch.service_type.as_deref(), Some("basic"));
        assert_eq!(porch.han_command.as_deref(), Some("gtmp"));
        assert_eq!(porch.polling_interval, Some(60));
        assert!(porch.channel.is_none());

        assert_eq!(config.services[1].channel, Some(1));

        let transport = config.transport_config();
        assert_eq!(transport.host, "hanserver.lan");
        assert_eq!(transport.line_ending, "\n");
    }
}
