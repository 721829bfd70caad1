//! Bridge
//!
//! Batched channel to the inspector. `send` only enqueues; the queue is
//! drained on the next tick, and after every successful drain a re-flush is
//! armed `batch_duration_ms` later so a busy producer is drained at a steady
//! cadence. `shutdown` is terminal and drains synchronously.

pub mod envelope;
pub mod protocol;
pub mod transport;

pub use envelope::{events, Envelope};
pub use protocol::{current_protocol, negotiate, ProtocolEntry, PROTOCOL_TABLE};
pub use transport::{ChannelTransport, MemoryTransport, Transport};

use crate::clock::Clock;
use crate::error::BridgeError;
use crate::ticker::Ticker;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Default re-flush cadence.
pub const DEFAULT_BATCH_DURATION_MS: u64 = 100;

/// Operations held before negotiation beyond this are dropped.
pub const MAX_HELD_OPERATIONS: usize = 1024;

/// Local listener for inbound or lifecycle events.
pub type Listener = Box<dyn FnMut(&Envelope) + Send>;

pub struct Bridge {
    transport: Box<dyn Transport>,
    clock: Arc<dyn Clock>,
    queue: Vec<Envelope>,
    /// Operations produced before a protocol was agreed.
    held_operations: Vec<Envelope>,
    /// Set after a rejected counterpart or a full hold buffer; operations
    /// are dropped until a protocol is agreed.
    dropping: bool,
    /// Some operations never reached the inspector.
    dropped_operations: bool,
    flush: Ticker,
    batch_duration_ms: u64,
    protocol: Option<ProtocolEntry>,
    listeners: HashMap<String, Vec<Listener>>,
    shut_down: bool,
}

impl Bridge {
    pub fn new(
        transport: impl Transport + 'static,
        clock: Arc<dyn Clock>,
        batch_duration_ms: u64,
    ) -> Self {
        Self {
            transport: Box::new(transport),
            clock,
            queue: Vec::new(),
            held_operations: Vec::new(),
            dropping: false,
            dropped_operations: false,
            flush: Ticker::new(),
            batch_duration_ms,
            protocol: None,
            listeners: HashMap::new(),
            shut_down: false,
        }
    }

    /// Agree on a protocol with the inspector. Held operations are released
    /// on success and dropped on rejection.
    pub fn negotiate(&mut self, counterpart: u32) -> Result<ProtocolEntry, BridgeError> {
        if self.shut_down {
            return Err(BridgeError::Shutdown);
        }
        let entry = match negotiate(counterpart) {
            Ok(entry) => entry,
            Err(e) => {
                if self.protocol.is_none() {
                    self.start_dropping("inspector protocol rejected");
                }
                return Err(e);
            }
        };
        info!(
            version = entry.version,
            counterpart, "bridge protocol negotiated"
        );
        self.protocol = Some(entry);
        self.dropping = false;
        let held = std::mem::take(&mut self.held_operations);
        for envelope in held {
            self.enqueue(envelope);
        }
        Ok(entry)
    }

    pub fn protocol(&self) -> Option<ProtocolEntry> {
        self.protocol
    }

    /// Operations waiting for negotiation.
    pub fn held(&self) -> usize {
        self.held_operations.len()
    }

    /// True once if operations were dropped since the last call.
    pub fn take_dropped_operations(&mut self) -> bool {
        std::mem::take(&mut self.dropped_operations)
    }

    fn start_dropping(&mut self, reason: &str) {
        if !self.dropping {
            warn!(
                reason,
                held = self.held_operations.len(),
                "dropping operations until a protocol is agreed"
            );
        }
        self.dropping = true;
        if !self.held_operations.is_empty() {
            self.dropped_operations = true;
            self.held_operations.clear();
        }
    }

    pub fn send(&mut self, event: &str, payload: Vec<Value>) {
        self.send_envelope(Envelope::new(event, payload));
    }

    pub fn send_envelope(&mut self, envelope: Envelope) {
        if self.shut_down {
            trace!(event = %envelope.event, "send after shutdown ignored");
            return;
        }
        self.enqueue(envelope);
    }

    /// Queue one operations message, or hold it until negotiation.
    pub fn send_operations(&mut self, message: &[u32]) {
        if self.shut_down {
            trace!("operations after shutdown ignored");
            return;
        }
        if self.protocol.is_some() {
            self.enqueue(Envelope::operations(message));
            return;
        }
        if !self.dropping && self.held_operations.len() >= MAX_HELD_OPERATIONS {
            self.start_dropping("hold buffer full");
        }
        if self.dropping {
            trace!("operations dropped before negotiation");
            self.dropped_operations = true;
            return;
        }
        self.held_operations.push(Envelope::operations(message));
    }

    fn enqueue(&mut self, envelope: Envelope) {
        self.queue.push(envelope);
        let now = self.clock.now_ms();
        self.flush.arm_if_idle(now);
    }

    pub fn add_listener(&mut self, event: &str, listener: Listener) {
        if self.shut_down {
            return;
        }
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    /// Deliver an inbound envelope to local listeners and hand it back for
    /// routing. Nothing is accepted after shutdown.
    pub fn receive(&mut self, envelope: Envelope) -> Option<Envelope> {
        if self.shut_down {
            trace!(event = %envelope.event, "inbound after shutdown ignored");
            return None;
        }
        self.emit_local(&envelope);
        Some(envelope)
    }

    fn emit_local(&mut self, envelope: &Envelope) {
        if let Some(listeners) = self.listeners.get_mut(&envelope.event) {
            for listener in listeners.iter_mut() {
                listener(envelope);
            }
        }
    }

    /// Flush if the flush deadline has passed.
    pub fn tick(&mut self, now: u64) {
        if self.flush.take_due(now) {
            self.flush_now(now);
        }
    }

    /// Send everything queued as one batch.
    ///
    /// On failure the batch stays at the head of the queue and no retry is
    /// armed; the next `send` schedules the next attempt.
    pub fn flush_now(&mut self, now: u64) -> bool {
        if self.queue.is_empty() {
            return false;
        }
        let batch = std::mem::take(&mut self.queue);
        match self.transport.send(&batch) {
            Ok(()) => {
                debug!(envelopes = batch.len(), "bridge batch delivered");
                self.flush.arm(now + self.batch_duration_ms);
                true
            }
            Err(e) => {
                warn!(error = %e, envelopes = batch.len(), "bridge batch not delivered");
                let mut retained = batch;
                retained.append(&mut self.queue);
                self.queue = retained;
                self.flush.cancel();
                false
            }
        }
    }

    /// Terminal: notify local listeners, send a remote `shutdown`, drain the
    /// queue synchronously, then ignore everything.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        let notice = Envelope::new(events::SHUTDOWN, Vec::new());
        self.emit_local(&notice);
        self.queue.append(&mut self.held_operations);
        self.queue.push(notice);

        let batch = std::mem::take(&mut self.queue);
        match self.transport.send(&batch) {
            Ok(()) => debug!(envelopes = batch.len(), "bridge drained on shutdown"),
            Err(e) => warn!(
                error = %e,
                dropped = batch.len(),
                "bridge could not drain on shutdown"
            ),
        }
        self.flush.cancel();
        self.listeners.clear();
        self.shut_down = true;
        info!("bridge shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Envelopes waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.flush.deadline()
    }
}
