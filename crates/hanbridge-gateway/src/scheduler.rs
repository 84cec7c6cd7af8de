//! Poll scheduler.
//!
//! Each polled service carries a countdown of ticks. A service is due on
//! the first tick after start-up and then every `polling_interval` ticks.

use crate::registry::{ServiceId, ServiceRegistry};

/// Advance every poll counter by one tick and return the services now due,
/// in configuration order.
pub fn due_services(registry: &mut ServiceRegistry) -> Vec<ServiceId> {
    let mut due = Vec::new();

    for (id, entry) in registry.iter_mut() {
        if entry.polling_interval == 0 {
            continue;
        }
        if entry.poll_counter <= 1 {
            entry.poll_counter = entry.polling_interval;
            due.push(id);
        } else {
            entry.poll_counter -= 1;
        }
    }

    due
}
