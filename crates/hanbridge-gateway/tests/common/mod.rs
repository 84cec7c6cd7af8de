//! Common test utilities for gateway integration tests.
//!
//! Builds a gateway over a [`MockTransport`] with a recording event sink,
//! plus helpers for the service definitions and bus requests the tests use.

#![allow(dead_code)]

use hanbridge_gateway::{
    BusEvent, BusRequest, EventSink, Gateway, GatewayOptions, ServiceDefinition, ServiceEntry,
    ServiceRegistry,
};
use hanbridge_network::{MockTransport, MockTransportHandle};
use std::time::Duration;

/// Event sink that keeps everything it is given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<BusEvent>,
    pub lifecycle: Vec<String>,
}

impl RecordingSink {
    /// Remove and return the events recorded so far.
    pub fn take(&mut self) -> Vec<BusEvent> {
        std::mem::take(&mut self.events)
    }
}

impl EventSink for RecordingSink {
    fn publish(&mut self, event: BusEvent) {
        self.events.push(event);
    }

    fn register(&mut self, service: &ServiceEntry) {
        self.lifecycle.push(format!("register {}", service.instance_id));
    }

    fn deregister(&mut self, service: &ServiceEntry) {
        self.lifecycle.push(format!("deregister {}", service.instance_id));
    }
}

pub type TestGateway = Gateway<MockTransport, RecordingSink>;

pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A sensor service on `address` answering to `instance`.
pub fn sensor(
    instance: &str,
    address: u32,
    command: &str,
    units: &str,
    polling_interval: u32,
) -> ServiceDefinition {
    ServiceDefinition {
        name: instance.to_string(),
        instance: instance.to_string(),
        address: Some(address),
        class: Some("sensor".to_string()),
        service_type: Some("basic".to_string()),
        han_command: Some(command.to_string()),
        units: Some(units.to_string()),
        polling_interval: Some(polling_interval),
        channel: None,
    }
}

/// A control service on `address` answering to `instance`.
pub fn control(instance: &str, address: u32, command: &str, channel: u32) -> ServiceDefinition {
    ServiceDefinition {
        name: instance.to_string(),
        instance: instance.to_string(),
        address: Some(address),
        class: Some("control".to_string()),
        service_type: Some("basic".to_string()),
        han_command: Some(command.to_string()),
        units: None,
        polling_interval: None,
        channel: Some(channel),
    }
}

/// Build a gateway and the handle that scripts its transport.
pub fn gateway(defs: &[ServiceDefinition]) -> (TestGateway, MockTransportHandle) {
    let registry = ServiceRegistry::from_definitions(defs).unwrap();
    let (transport, handle) = MockTransport::new();
    let options = GatewayOptions {
        tick_interval: Duration::from_secs(1),
        response_timeout: RESPONSE_TIMEOUT,
    };
    (
        Gateway::new(registry, transport, RecordingSink::default(), options),
        handle,
    )
}

/// A `request=current` read for a sensor.
pub fn read_request(instance: &str) -> BusRequest {
    BusRequest::new(instance, "sensor", "basic").with_field("request", "current")
}

/// A GOUT write for a control service.
pub fn output_request(instance: &str, level: &str) -> BusRequest {
    BusRequest::new(instance, "control", "basic")
        .with_field("device", "1")
        .with_field("type", "output")
        .with_field("current", level)
}
