//! hanbridge - HAN protocol gateway.
//!
//! Reads its configuration from the TOML file named by `HANBRIDGE_CONFIG`,
//! takes bus requests as JSON lines on stdin and writes bus events as JSON
//! lines to stdout.

mod logging;
mod shutdown;
mod stdio_bus;

use anyhow::{Context, Result};
use hanbridge_gateway::{Gateway, GatewayConfig, GatewayOptions, ServiceRegistry};
use hanbridge_network::{LineTransport, TcpTransport};
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const CONFIG_ENV: &str = "HANBRIDGE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "/etc/hanbridge.toml";

/// Bus requests waiting for the engine.
const REQUEST_BACKLOG: usize = 64;

fn load_config(path: &Path) -> Result<GatewayConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read configuration file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid configuration in {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(Path::new(&path))?;

    logging::init_logging(&config.log_level);
    info!(version = hanbridge_core::VERSION, config = %path, "Starting hanbridge");

    config.validate().context("invalid gateway configuration")?;
    let registry = ServiceRegistry::from_definitions(&config.services)
        .context("invalid service definition")?;

    // Fail early if the HAN server is unreachable.
    let mut transport = TcpTransport::new(config.transport_config());
    if let Err(e) = transport.ensure_connected().await {
        error!(host = %config.host, port = config.port, "HAN server unreachable: {}", e);
        return Err(e).with_context(|| {
            format!("cannot connect to HAN server at {}:{}", config.host, config.port)
        });
    }
    transport
        .close()
        .await
        .context("cannot close startup connection")?;

    let shutdown = CancellationToken::new();
    shutdown::spawn_signal_handler(shutdown.clone()).context("cannot install signal handlers")?;

    let (request_tx, request_rx) = mpsc::channel(REQUEST_BACKLOG);
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    stdio_bus::spawn_request_reader(request_tx).context("cannot start stdin reader")?;
    let writer = tokio::spawn(stdio_bus::write_events(event_rx));

    let mut gateway = Gateway::new(registry, transport, event_tx, GatewayOptions::from(&config));
    gateway.run(request_rx, shutdown).await;

    // Closes the event channel so the writer drains and exits.
    drop(gateway);
    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Event output failed: {}", e),
        Err(e) => warn!("Event writer task failed: {}", e),
    }

    info!("hanbridge stopped");
    Ok(())
}
