//! Turning readings into bus events.
//!
//! A reading that answers a bus request is always reported as a status
//! event. A reading that answers a poll is reported as a trigger event only
//! when it differs from the previous polled reading of the same service.

use hanbridge_protocol::{ChangeKey, Reading};
use tracing::debug;

use crate::bus::{BusEvent, EventKind};
use crate::registry::ServiceEntry;

/// Build the event for `reading`, updating the change cache on polls.
///
/// Returns `None` when a polled reading has not changed.
pub fn apply(service: &mut ServiceEntry, reading: Reading, is_poll: bool) -> Option<BusEvent> {
    let kind = if is_poll {
        if !record_change(service, reading.change_key) {
            return None;
        }
        debug!(instance = %service.instance_id, "Sending trigger");
        EventKind::Trigger
    } else {
        EventKind::Status
    };

    let mut event = BusEvent::sensor_basic(kind, service.instance_id.clone());
    if let Some(device) = reading.device {
        event.push_field("device", device);
    }
    event.push_field("type", reading.quantity);
    event.push_field("current", reading.current);
    if let Some(units) = reading.units {
        event.push_field("units", units);
    }

    Some(event)
}

/// Store `key` if it differs from the cached value. Returns `true` on change.
fn record_change(service: &mut ServiceEntry, key: ChangeKey) -> bool {
    match key {
        ChangeKey::Int(value) => {
            if service.last_int == Some(value) {
                return false;
            }
            service.last_int = Some(value);
        }
        ChangeKey::Float(value) => {
            if service.last_float == Some(value) {
                return false;
            }
            service.last_float = Some(value);
        }
    }
    true
}
