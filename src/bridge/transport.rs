//! Transports carry envelope batches to the inspector.

use crate::bridge::envelope::Envelope;
use crate::error::TransportError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

/// Delivers one batch at a time. A failed batch is not retried by the
/// transport; the bridge keeps it queued.
pub trait Transport: Send {
    fn send(&mut self, batch: &[Envelope]) -> Result<(), TransportError>;
}

/// In-process transport over an mpsc channel.
#[derive(Clone)]
pub struct ChannelTransport {
    sender: Sender<Vec<Envelope>>,
}

impl ChannelTransport {
    pub fn new_pair() -> (Self, Receiver<Vec<Envelope>>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, batch: &[Envelope]) -> Result<(), TransportError> {
        self.sender
            .send(batch.to_vec())
            .map_err(|_| TransportError::Closed)
    }
}

/// Keeps every delivered batch in memory. Clones share the same record.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    batches: Arc<Mutex<Vec<Vec<Envelope>>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<Vec<Envelope>> {
        self.batches.lock().clone()
    }

    /// Every delivered envelope, in delivery order.
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.batches.lock().iter().flatten().cloned().collect()
    }

    /// Delivered envelopes named `event`.
    pub fn events(&self, event: &str) -> Vec<Envelope> {
        self.envelopes()
            .into_iter()
            .filter(|envelope| envelope.event == event)
            .collect()
    }

    pub fn clear(&self) {
        self.batches.lock().clear();
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, batch: &[Envelope]) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Delivery("transport marked failing".into()));
        }
        self.batches.lock().push(batch.to_vec());
        Ok(())
    }
}
