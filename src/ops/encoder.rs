//! Operation encoder and flush gate.

use crate::ops::operation::{opcode, Operation};
use crate::ops::strings::StringTable;
use crate::types::{SourceId, StableId};
use tracing::debug;

/// Buffers operations for one provider between flushes.
///
/// Unmounts are not buffered as operations: they are collected separately
/// and coalesced into a single `REMOVE` at the head of the next message.
#[derive(Debug, Default)]
pub struct OperationEncoder {
    pending_ops: Vec<u32>,
    simulated_unmounts: Vec<StableId>,
    real_unmounts: Vec<StableId>,
    root_removal: bool,
    removed_root: Option<StableId>,
    profiling_data: bool,
    strings: StringTable,
}

impl OperationEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string into this flush's table.
    pub fn intern(&mut self, value: Option<&str>) -> u32 {
        self.strings.intern(value)
    }

    /// Append an operation in traversal order.
    ///
    /// `Remove` ids join the coalesced batch as real unmounts and
    /// `RemoveRoot` removes the root the message is flushed under; neither
    /// lands in the op buffer.
    pub fn push_op(&mut self, op: Operation) {
        match op {
            Operation::Remove { ids } => self.real_unmounts.extend(ids),
            Operation::RemoveRoot => self.root_removal = true,
            other => other.encode_into(&mut self.pending_ops),
        }
    }

    /// Record an unmount detected in traversal order.
    pub fn record_unmount(&mut self, id: StableId, simulated: bool) {
        if simulated {
            self.simulated_unmounts.push(id);
        } else {
            self.real_unmounts.push(id);
        }
    }

    /// Remove `root` itself. The message carrying the removal is addressed
    /// to `root` whatever root id the flush is called with.
    pub fn record_root_removal(&mut self, root: StableId) {
        self.root_removal = true;
        self.removed_root = Some(root);
    }

    pub fn pending_root_removal(&self) -> Option<StableId> {
        self.removed_root
    }

    /// Profiling durations are waiting to be reported with the next message.
    pub fn mark_profiling_data(&mut self) {
        self.profiling_data = true;
    }

    pub fn pending_unmount_count(&self) -> usize {
        self.simulated_unmounts.len() + self.real_unmounts.len()
    }

    pub fn is_unmount_pending(&self, id: StableId) -> bool {
        self.real_unmounts.contains(&id) || self.simulated_unmounts.contains(&id)
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// False iff a flush would carry nothing at all.
    pub fn should_flush(&self) -> bool {
        !self.pending_ops.is_empty()
            || !self.simulated_unmounts.is_empty()
            || !self.real_unmounts.is_empty()
            || self.root_removal
            || self.profiling_data
    }

    /// Produce one message and reset all pending state, or `None` if there
    /// is nothing to send.
    ///
    /// Layout: header, string table, one coalesced `REMOVE` (simulated
    /// unmounts in detection order, then real unmounts in reverse detection
    /// order), `REMOVE_ROOT`, then buffered ops.
    pub fn flush(&mut self, source_id: SourceId, root_id: StableId) -> Option<Vec<u32>> {
        if !self.should_flush() {
            return None;
        }
        let root_id = self.removed_root.unwrap_or(root_id);

        let unmount_count = self.pending_unmount_count();
        let expected_len = 3
            + self.strings.encoded_len()
            + if unmount_count > 0 { 2 + unmount_count } else { 0 }
            + usize::from(self.root_removal)
            + self.pending_ops.len();

        let mut out = Vec::with_capacity(expected_len);
        out.push(source_id);
        out.push(root_id.get());
        out.push(self.strings.encoded_len() as u32);
        self.strings.encode_into(&mut out);

        if unmount_count > 0 {
            out.push(opcode::REMOVE);
            out.push(unmount_count as u32);
            out.extend(self.simulated_unmounts.iter().map(|id| id.get()));
            out.extend(self.real_unmounts.iter().rev().map(|id| id.get()));
        }
        if self.root_removal {
            out.push(opcode::REMOVE_ROOT);
        }
        out.extend_from_slice(&self.pending_ops);
        debug_assert_eq!(out.len(), expected_len);

        debug!(
            source_id,
            root_id = root_id.get(),
            strings = self.strings.len(),
            unmounts = unmount_count,
            len = out.len(),
            "flushed operations"
        );
        self.clear();
        Some(out)
    }

    /// Drop everything pending without sending.
    pub fn clear(&mut self) {
        self.pending_ops.clear();
        self.simulated_unmounts.clear();
        self.real_unmounts.clear();
        self.root_removal = false;
        self.removed_root = None;
        self.profiling_data = false;
        self.strings.clear();
    }
}
