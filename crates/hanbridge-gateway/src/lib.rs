//! HAN protocol gateway engine.
//!
//! Bridges bus requests to HAN command frames and HAN replies back to bus
//! events, over a single connection with at most one request in flight.
//!
//! # Components
//!
//! - **ServiceRegistry**: configured services and their runtime state
//! - **WorkQueue**: FIFO of commands waiting for the line
//! - **Gateway**: correlation, polling and the reactor loop
//! - **EventSink**: where events go

pub mod actions;
pub mod bus;
pub mod config;
pub mod engine;
pub mod queue;
pub mod registry;
pub mod request;
pub mod scheduler;

pub use bus::{BusEvent, BusRequest, EventKind, EventSink};
pub use config::{GatewayConfig, ServiceDefinition};
pub use engine::{Gateway, GatewayOptions, PendingRequest};
pub use queue::{WorkQueue, WorkQueueEntry};
pub use registry::{ServiceEntry, ServiceId, ServiceRegistry};
