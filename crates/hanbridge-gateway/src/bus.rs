//! Message bus boundary.
//!
//! The gateway consumes [`BusRequest`]s and produces [`BusEvent`]s. How
//! they travel (framing, addressing, delivery) belongs to the bus adapter
//! in front of the gateway; this module only fixes their structure.

use hanbridge_core::constants::{EVENT_SCHEMA_CLASS, EVENT_SCHEMA_TYPE};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::registry::ServiceEntry;

/// A command addressed to one service.
///
/// # Example
///
/// ```
/// use hanbridge_gateway::BusRequest;
///
/// let request = BusRequest::new("porch-temp", "sensor", "basic").with_field("request", "current");
/// assert_eq!(request.field("request"), Some("current"));
/// assert_eq!(request.field("device"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BusRequest {
    /// Target instance ID
    #[serde(rename = "instance")]
    pub instance_id: String,

    /// Schema class
    pub class: String,

    /// Schema type
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Named message fields
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

impl BusRequest {
    pub fn new(
        instance_id: impl Into<String>,
        class: impl Into<String>,
        schema_type: impl Into<String>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            class: class.into(),
            schema_type: schema_type.into(),
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Whether an event answers a request or reports a polled change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Reply to a bus request, always sent
    Status,
    /// Poll result that differs from the previous one
    Trigger,
}

/// A reading published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusEvent {
    pub kind: EventKind,

    /// Instance ID of the reporting service
    #[serde(rename = "instance")]
    pub instance_id: String,

    pub class: &'static str,

    #[serde(rename = "type")]
    pub schema_type: &'static str,

    /// Named fields in emission order
    #[serde(serialize_with = "ordered_map")]
    pub fields: Vec<(String, String)>,
}

impl BusEvent {
    /// Create an event with the `sensor.basic` schema and no fields.
    pub fn sensor_basic(kind: EventKind, instance_id: impl Into<String>) -> Self {
        Self {
            kind,
            instance_id: instance_id.into(),
            class: EVENT_SCHEMA_CLASS,
            schema_type: EVENT_SCHEMA_TYPE,
            fields: Vec::new(),
        }
    }

    pub fn push_field(&mut self, name: &str, value: impl Into<String>) {
        self.fields.push((name.to_string(), value.into()));
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

fn ordered_map<S: Serializer>(fields: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(fields.iter().map(|(k, v)| (k, v)))
}

/// Where the gateway delivers events.
///
/// `register` and `deregister` bracket the lifetime of each service on the
/// bus: every service is registered once at start-up in configuration order
/// and deregistered in reverse order at shutdown.
pub trait EventSink {
    fn publish(&mut self, event: BusEvent);

    fn register(&mut self, service: &ServiceEntry) {
        info!(service = %service.name, instance = %service.instance_id, "Service registered");
    }

    fn deregister(&mut self, service: &ServiceEntry) {
        info!(service = %service.name, instance = %service.instance_id, "Service deregistered");
    }
}

impl EventSink for mpsc::UnboundedSender<BusEvent> {
    fn publish(&mut self, event: BusEvent) {
        if self.send(event).is_err() {
            warn!("Event receiver closed, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_fields_keep_order() {
        let mut event = BusEvent::sensor_basic(EventKind::Trigger, "porch-temp");
        event.push_field("device", "0");
        event.push_field("type", "temp");
        event.push_field("current", "21");

        assert_eq!(event.field("type"), Some("temp"));
        assert_eq!(event.field("units"), None);

        let names: Vec<_> = event.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["device", "type", "current"]);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (mut tx, mut rx) = mpsc::unbounded_channel();
        tx.publish(BusEvent::sensor_basic(EventKind::Status, "lamp"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::Status);
        assert_eq!((event.class, event.schema_type), ("sensor", "basic"));
    }
}
