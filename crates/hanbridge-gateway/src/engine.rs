//! Gateway engine and reactor loop.
//!
//! The engine owns all mutable gateway state: the service registry, the
//! command queue, the single in-flight request and the transport. It runs
//! on one task, so none of it is shared or locked.
//!
//! ```text
//!   bus request ──> validate ──> encode ──┐
//!                                         ├──> WorkQueue ──(tick)──> transport
//!   tick ──> poll scheduler ──> encode ───┘                             │
//!                                                                       v
//!   bus event <── actions <── readings <── ResponseFrame <── reply line
//! ```
//!
//! At most one command is outstanding. A command is written on a tick only
//! when no reply is pending; a pending request older than the response
//! timeout is abandoned on the next tick.

use hanbridge_core::Error;
use hanbridge_network::{Incoming, LineTransport};
use hanbridge_protocol::{HanRequest, ResponseFrame, encode, readings};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::actions;
use crate::bus::{BusRequest, EventSink};
use crate::config::GatewayConfig;
use crate::queue::{WorkQueue, WorkQueueEntry};
use crate::registry::{ServiceId, ServiceRegistry};
use crate::request;
use crate::scheduler;

/// Engine timing.
#[derive(Debug, Clone, Copy)]
pub struct GatewayOptions {
    /// Period of the scheduler tick
    pub tick_interval: Duration,

    /// How long a sent command waits for its reply
    pub response_timeout: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        GatewayConfig::default().into()
    }
}

impl From<&GatewayConfig> for GatewayOptions {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            response_timeout: config.response_timeout(),
        }
    }
}

impl From<GatewayConfig> for GatewayOptions {
    fn from(config: GatewayConfig) -> Self {
        (&config).into()
    }
}

/// The command currently awaiting a reply.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub entry: WorkQueueEntry,
    pub sent_at: Instant,
}

/// The HAN protocol engine.
pub struct Gateway<T, S> {
    registry: ServiceRegistry,
    queue: WorkQueue,
    pending: Option<PendingRequest>,
    transport: T,
    sink: S,
    options: GatewayOptions,

    /// Set when the last connect or write failed
    transport_fault: bool,
}

impl<T: LineTransport, S: EventSink> Gateway<T, S> {
    pub fn new(registry: ServiceRegistry, transport: T, sink: S, options: GatewayOptions) -> Self {
        Self {
            registry,
            queue: WorkQueue::new(),
            pending: None,
            transport,
            sink,
            options,
            transport_fault: false,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// `true` if the last connect or write attempt failed.
    pub fn has_transport_fault(&self) -> bool {
        self.transport_fault
    }

    /// Announce every service to the bus, in configuration order.
    pub fn register_services(&mut self) {
        for (_, entry) in self.registry.iter() {
            self.sink.register(entry);
        }
    }

    /// Withdraw every service from the bus, in reverse configuration order.
    pub fn deregister_services(&mut self) {
        for (_, entry) in self.registry.iter().rev() {
            self.sink.deregister(entry);
        }
    }

    /// Validate a bus request and queue the command it asks for.
    ///
    /// Requests for unknown instances are ignored. Invalid requests are
    /// logged and dropped.
    pub fn handle_request(&mut self, request: &BusRequest) {
        let Some(id) = self.registry.lookup(&request.instance_id) else {
            trace!(instance = %request.instance_id, "Request for unknown instance");
            return;
        };
        let Some(service) = self.registry.get(id) else {
            return;
        };

        if request.class != service.class || request.schema_type != service.schema_type {
            debug!(
                instance = %request.instance_id,
                class = %request.class,
                schema_type = %request.schema_type,
                "Schema does not match service, ignoring request"
            );
            return;
        }

        let han_request = match request::validate(service, request) {
            Ok(han_request) => han_request,
            Err(e) => {
                warn!(instance = %service.instance_id, "Dropping bus request: {}", e);
                return;
            }
        };

        debug!(instance = %service.instance_id, command = %service.command, "Bus request accepted");
        self.queue_command(id, han_request, false);
    }

    fn queue_command(&mut self, id: ServiceId, han_request: HanRequest, is_poll: bool) {
        let Some(service) = self.registry.get(id) else {
            return;
        };

        match encode(service.command, service.address, service.channel, han_request) {
            Ok(frame) => self.queue.enqueue(frame, id, is_poll),
            Err(e) => warn!(instance = %service.instance_id, "Cannot encode command: {}", e),
        }
    }

    /// One scheduler tick: queue due polls, expire a stale request, then
    /// send the next command if the line is free.
    pub async fn tick(&mut self) {
        for id in scheduler::due_services(&mut self.registry) {
            self.queue_command(id, HanRequest::Read, true);
        }

        self.expire_pending();
        self.send_next().await;
    }

    fn expire_pending(&mut self) {
        let expired = self
            .pending
            .as_ref()
            .is_some_and(|p| p.sent_at.elapsed() >= self.options.response_timeout);

        if expired && let Some(pending) = self.pending.take() {
            warn!(
                frame = %pending.entry.command,
                timeout_ms = self.options.response_timeout.as_millis() as u64,
                "Request timed out"
            );
        }
    }

    async fn send_next(&mut self) {
        if self.pending.is_some() || self.queue.is_empty() {
            return;
        }

        if let Err(e) = self.transport.ensure_connected().await {
            // The head command cannot be delivered.
            if let Some(lost) = self.queue.dequeue_oldest() {
                warn!(frame = %lost.command, "Cannot reach HAN server, dropping command: {}", e);
            }
            self.transport_fault = true;
            return;
        }

        let Some(entry) = self.queue.dequeue_oldest() else {
            return;
        };

        match self.transport.send_line(&entry.command).await {
            Ok(()) => {
                debug!(frame = %entry.command, is_poll = entry.is_poll, "Command sent");
                self.transport_fault = false;
                self.pending = Some(PendingRequest {
                    entry,
                    sent_at: Instant::now(),
                });
            }
            Err(e) => {
                warn!(frame = %entry.command, "Write to HAN server failed, command lost: {}", e);
                self.transport_fault = true;
            }
        }
    }

    /// React to something read from the transport.
    pub fn handle_incoming(&mut self, incoming: Incoming) {
        match incoming {
            Incoming::Line(line) => self.handle_line(&line),
            Incoming::Empty => {}
            Incoming::Closed => {
                info!("HAN server closed the connection");
                self.abandon_pending();
            }
            Incoming::Error(e) => {
                warn!("HAN connection failed: {}", e);
                self.abandon_pending();
            }
        }
    }

    // No reply can arrive on a connection that is gone.
    fn abandon_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            warn!(frame = %pending.entry.command, "Connection lost with a request pending");
        }
    }

    /// Decode one reply line and publish the resulting event.
    pub fn handle_line(&mut self, line: &str) {
        let frame = match ResponseFrame::parse(line) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                trace!(line, "Ignoring non-reply line");
                return;
            }
            Err(e) => {
                warn!(line, "Dropping reply: {}", e);
                self.pending = None;
                return;
            }
        };

        // A reply is consumed at most once, whatever happens below.
        let Some(pending) = self.pending.take() else {
            debug!(reply = %frame, "Reply with no request pending");
            return;
        };

        if let Err(e) = self.dispatch(&frame, &pending.entry) {
            warn!(reply = %frame, "Dropping reply: {}", e);
        }
    }

    fn dispatch(&mut self, frame: &ResponseFrame, entry: &WorkQueueEntry) -> Result<(), Error> {
        let service = self
            .registry
            .get_mut(entry.service)
            .ok_or_else(|| Error::malformed("reply for a service that no longer exists"))?;

        if frame.address != service.address.as_u8() {
            return Err(Error::malformed(format!(
                "address {:02X} does not match pending request to {}",
                frame.address, service.address
            )));
        }

        let command = frame
            .han_command()
            .ok_or(Error::UnknownResponseCode {
                code: frame.command,
            })?;

        let Some(reading) = readings::decode(command, service.units, frame.params())? else {
            trace!(reply = %frame, "Reply carries no reading");
            return Ok(());
        };
        debug!(
            instance = %service.instance_id,
            quantity = reading.quantity,
            current = %reading.current,
            "Decoded reading"
        );

        if let Some(event) = actions::apply(service, reading, entry.is_poll) {
            self.sink.publish(event);
        }
        Ok(())
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Services are registered on entry and deregistered on exit, and the
    /// transport is closed before returning. If the request channel closes
    /// the gateway keeps polling.
    pub async fn run(&mut self, mut requests: mpsc::Receiver<BusRequest>, shutdown: CancellationToken) {
        self.register_services();
        info!(services = self.registry.len(), "Gateway running");

        let mut ticker = tokio::time::interval(self.options.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut bus_open = true;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                // A steady stream of lines must not hold off ticks.
                _ = ticker.tick() => self.tick().await,

                incoming = self.transport.recv() => self.handle_incoming(incoming),

                request = requests.recv(), if bus_open => match request {
                    Some(request) => self.handle_request(&request),
                    None => {
                        debug!("Bus request channel closed");
                        bus_open = false;
                    }
                },
            }
        }

        info!("Gateway shutting down");
        self.deregister_services();
        if let Err(e) = self.transport.close().await {
            warn!("Error closing HAN connection: {}", e);
        }
    }
}
