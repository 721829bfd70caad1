//! Error types for the treeglass agent.

use crate::types::{NodeRef, SourceId, StableId};
use thiserror::Error;

/// Identity registry invariant violations.
///
/// Any of these indicates a bug in the agent, never a host race.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Id conflict: {node} resolves to {existing} but its alternate {alternate} holds {other}")]
    IdConflict {
        node: NodeRef,
        alternate: NodeRef,
        existing: StableId,
        other: StableId,
    },
}

/// Malformed operation payloads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Payload truncated at offset {0}")]
    Truncated(usize),

    #[error("Unknown opcode {opcode} at offset {offset}")]
    UnknownOpcode { opcode: u32, offset: usize },

    #[error("Unknown element type {code} at offset {offset}")]
    UnknownElementType { code: u32, offset: usize },

    #[error("Invalid code point {0:#x} in string table")]
    InvalidCodePoint(u32),

    #[error("String table overruns payload (declared {declared}, available {available})")]
    StringTableOverrun { declared: usize, available: usize },

    #[error("String id {0} is not present in the string table")]
    UnknownStringId(u32),
}

/// An operations stream the mirror refuses to apply.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MirrorError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Source {source_id}: node {id} added twice")]
    DuplicateAdd { source_id: SourceId, id: StableId },

    #[error("Source {source_id}: node {id} added under unknown parent {parent}")]
    UnknownParent {
        source_id: SourceId,
        id: StableId,
        parent: StableId,
    },

    #[error("Source {source_id}: {op} references unknown node {id}")]
    UnknownNode {
        source_id: SourceId,
        id: StableId,
        op: &'static str,
    },

    #[error("Source {source_id}: node {id} removed while it still has children")]
    RemoveWithChildren { source_id: SourceId, id: StableId },

    #[error("Source {source_id}: removal of root {root} that was never added")]
    UnknownRoot { source_id: SourceId, root: StableId },

    #[error("Source {source_id}: reorder of {id} does not match its children")]
    ReorderMismatch { source_id: SourceId, id: StableId },
}

/// The wall could not deliver a batch.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Channel closed")]
    Closed,

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Bridge-level failures surfaced to callers that expect a result.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("No mutually supported protocol for counterpart version {0}")]
    ProtocolMismatch(String),

    #[error("Bridge is shut down")]
    Shutdown,
}

/// Top-level agent errors.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Registry invariant violated: {0}")]
    Registry(#[from] RegistryError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Source {0} is not attached")]
    UnknownSource(SourceId),

    #[error("Source {0} is attached with an unsupported schema")]
    UnsupportedSource(SourceId),

    #[error("Source {0} is already attached")]
    DuplicateSource(SourceId),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Mirror rejected operations: {0}")]
    Mirror(#[from] MirrorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for AgentError {
    fn from(err: config::ConfigError) -> Self {
        AgentError::ConfigError(err.to_string())
    }
}
