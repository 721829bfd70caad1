//! Operation variants and their wire layout.

use crate::host::ElementType;
use crate::types::{wire_id, StableId};
use serde::Serialize;

/// Wire opcodes.
pub mod opcode {
    pub const ADD: u32 = 1;
    pub const REMOVE: u32 = 2;
    pub const REORDER: u32 = 3;
    pub const UPDATE_DURATION: u32 = 4;
    pub const UPDATE_ERROR_WARNING_COUNTS: u32 = 5;
    pub const REMOVE_ROOT: u32 = 6;
    pub const SET_SUBTREE_MODE: u32 = 7;
}

/// Flags carried by `ADD_ROOT`.
pub mod root_flags {
    pub const STRICT_MODE_COMPLIANT: u32 = 1;
    pub const SUPPORTS_PROFILING: u32 = 1 << 1;
    pub const HAS_OWNER_METADATA: u32 = 1 << 2;
}

/// Subtree mode value for strict subtrees.
pub const SUBTREE_MODE_STRICT: u32 = 1;

/// One structural fact about the mirrored tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Add {
        id: StableId,
        element_type: ElementType,
        parent_id: StableId,
        owner_id: Option<StableId>,
        name_id: u32,
        key_id: u32,
    },
    AddRoot {
        id: StableId,
        flags: u32,
    },
    Remove {
        ids: Vec<StableId>,
    },
    RemoveRoot,
    Reorder {
        id: StableId,
        children: Vec<StableId>,
    },
    SetSubtreeMode {
        id: StableId,
        mode: u32,
    },
    UpdateDuration {
        id: StableId,
        duration: u32,
    },
    UpdateErrorWarningCounts {
        id: StableId,
        errors: u32,
        warnings: u32,
    },
}

impl Operation {
    /// Integers this operation occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        match self {
            Operation::Add { .. } => 7,
            Operation::AddRoot { .. } => 4,
            Operation::Remove { ids } => 2 + ids.len(),
            Operation::RemoveRoot => 1,
            Operation::Reorder { children, .. } => 3 + children.len(),
            Operation::SetSubtreeMode { .. } => 3,
            Operation::UpdateDuration { .. } => 3,
            Operation::UpdateErrorWarningCounts { .. } => 4,
        }
    }

    pub fn encode_into(&self, out: &mut Vec<u32>) {
        match self {
            Operation::Add {
                id,
                element_type,
                parent_id,
                owner_id,
                name_id,
                key_id,
            } => out.extend_from_slice(&[
                opcode::ADD,
                id.get(),
                element_type.code(),
                parent_id.get(),
                wire_id(*owner_id),
                *name_id,
                *key_id,
            ]),
            Operation::AddRoot { id, flags } => out.extend_from_slice(&[
                opcode::ADD,
                id.get(),
                ElementType::Root.code(),
                *flags,
            ]),
            Operation::Remove { ids } => {
                out.push(opcode::REMOVE);
                out.push(ids.len() as u32);
                out.extend(ids.iter().map(|id| id.get()));
            }
            Operation::RemoveRoot => out.push(opcode::REMOVE_ROOT),
            Operation::Reorder { id, children } => {
                out.push(opcode::REORDER);
                out.push(id.get());
                out.push(children.len() as u32);
                out.extend(children.iter().map(|id| id.get()));
            }
            Operation::SetSubtreeMode { id, mode } => {
                out.extend_from_slice(&[opcode::SET_SUBTREE_MODE, id.get(), *mode])
            }
            Operation::UpdateDuration { id, duration } => {
                out.extend_from_slice(&[opcode::UPDATE_DURATION, id.get(), *duration])
            }
            Operation::UpdateErrorWarningCounts {
                id,
                errors,
                warnings,
            } => out.extend_from_slice(&[
                opcode::UPDATE_ERROR_WARNING_COUNTS,
                id.get(),
                *errors,
                *warnings,
            ]),
        }
    }

    /// Short name used in logs and CLI tables.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add { .. } => "ADD",
            Operation::AddRoot { .. } => "ADD_ROOT",
            Operation::Remove { .. } => "REMOVE",
            Operation::RemoveRoot => "REMOVE_ROOT",
            Operation::Reorder { .. } => "REORDER",
            Operation::SetSubtreeMode { .. } => "SET_SUBTREE_MODE",
            Operation::UpdateDuration { .. } => "UPDATE_DURATION",
            Operation::UpdateErrorWarningCounts { .. } => "UPDATE_ERROR_WARNING_COUNTS",
        }
    }
}

/// Milliseconds to the integer microseconds carried by `UPDATE_DURATION`.
pub fn duration_to_wire(ms: f64) -> u32 {
    if !ms.is_finite() || ms <= 0.0 {
        return 0;
    }
    (ms * 1000.0).floor().min(u32::MAX as f64) as u32
}
