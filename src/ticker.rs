//! Cancellable one-shot deadlines.
//!
//! Every timer in the agent (bridge flush, untrack sweep, error aggregation)
//! is a `Ticker`: plain data holding an optional deadline. The session polls
//! tickers from `tick`; cancellation is clearing the handle.

/// A single pending deadline, or none.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Ticker {
    due_at: Option<u64>,
}

impl Ticker {
    pub fn new() -> Self {
        Self { due_at: None }
    }

    /// Arm (or re-arm) the ticker to fire at `due_at`.
    pub fn arm(&mut self, due_at: u64) {
        self.due_at = Some(due_at);
    }

    /// Arm only if nothing is pending. Returns true if this call armed it.
    pub fn arm_if_idle(&mut self, due_at: u64) -> bool {
        if self.due_at.is_some() {
            return false;
        }
        self.due_at = Some(due_at);
        true
    }

    pub fn cancel(&mut self) {
        self.due_at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.due_at.is_some()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.due_at
    }

    /// Disarm and report true if the deadline has passed.
    pub fn take_due(&mut self, now: u64) -> bool {
        match self.due_at {
            Some(at) if at <= now => {
                self.due_at = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of several optional deadlines.
pub fn earliest(deadlines: impl IntoIterator<Item = Option<u64>>) -> Option<u64> {
    deadlines.into_iter().flatten().min()
}
