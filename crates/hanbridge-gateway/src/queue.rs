//! Outbound command queue.
//!
//! Commands are sent to the HAN server strictly in submission order, one at
//! a time. Entries own their frame text and refer to their service by
//! [`ServiceId`].

use std::collections::VecDeque;
use tracing::trace;

use crate::registry::ServiceId;

/// A command waiting to be written to the HAN server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkQueueEntry {
    /// Fully formatted command frame
    pub command: String,

    /// Service the reply belongs to
    pub service: ServiceId,

    /// `true` when the scheduler queued this command
    pub is_poll: bool,
}

/// FIFO of pending commands.
#[derive(Debug, Default)]
pub struct WorkQueue {
    entries: VecDeque<WorkQueueEntry>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command behind everything already queued.
    pub fn enqueue(&mut self, command: String, service: ServiceId, is_poll: bool) {
        trace!(frame = %command, is_poll, depth = self.entries.len() + 1, "Queued command");
        self.entries.push_back(WorkQueueEntry {
            command,
            service,
            is_poll,
        });
    }

    /// Remove and return the earliest queued command.
    pub fn dequeue_oldest(&mut self) -> Option<WorkQueueEntry> {
        self.entries.pop_front()
    }

    /// Look at the earliest queued command without removing it.
    pub fn peek_oldest(&self) -> Option<&WorkQueueEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServiceRegistry;
    use crate::config::ServiceDefinition;
    use proptest::prelude::*;

    fn ids(count: usize) -> Vec<ServiceId> {
        let defs: Vec<ServiceDefinition> = (0..count)
            .map(|i| ServiceDefinition {
                name: format!("s{i}"),
                instance: format!("i{i}"),
                address: Some(1),
                class: Some("control".to_string()),
                service_type: Some("basic".to_string()),
                han_command: Some("gout".to_string()),
                ..Default::default()
            })
            .collect();
        let registry = ServiceRegistry::from_definitions(&defs).unwrap();
        registry.iter().map(|(id, _)| id).collect()
    }

    #[test]
    fn test_fifo_order() {
        let ids = ids(3);
        let mut queue = WorkQueue::new();
        queue.enqueue("A".to_string(), ids[0], false);
        queue.enqueue("B".to_string(), ids[1], true);
        queue.enqueue("C".to_string(), ids[2], false);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek_oldest().unwrap().command, "A");

        let a = queue.dequeue_oldest().unwrap();
        assert_eq!((a.command.as_str(), a.service, a.is_poll), ("A", ids[0], false));
        let b = queue.dequeue_oldest().unwrap();
        assert_eq!((b.command.as_str(), b.service, b.is_poll), ("B", ids[1], true));
        assert_eq!(queue.dequeue_oldest().unwrap().command, "C");
        assert!(queue.dequeue_oldest().is_none());
        assert!(queue.is_empty());
    }

    proptest! {
        #[test]
        fn prop_drain_matches_submission(commands in prop::collection::vec("[0-9A-F]{4,12}", 0..32)) {
            let id = ids(1)[0];
            let mut queue = WorkQueue::new();
            for command in &commands {
                queue.enqueue(command.clone(), id, false);
            }

            let mut drained = Vec::new();
            while let Some(entry) = queue.dequeue_oldest() {
                drained.push(entry.command);
            }
            prop_assert_eq!(drained, commands);
        }
    }
}
