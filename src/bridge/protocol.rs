//! Bridge protocol versions.

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};

/// One supported protocol version and the counterpart versions it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolEntry {
    pub version: u32,
    pub min_counterpart: u32,
    /// `None` means no upper bound.
    pub max_counterpart: Option<u32>,
}

impl ProtocolEntry {
    pub fn accepts(&self, counterpart: u32) -> bool {
        counterpart >= self.min_counterpart
            && self.max_counterpart.map_or(true, |max| counterpart <= max)
    }
}

/// Supported versions, ascending.
pub const PROTOCOL_TABLE: &[ProtocolEntry] = &[
    ProtocolEntry {
        version: 1,
        min_counterpart: 1,
        max_counterpart: Some(2),
    },
    ProtocolEntry {
        version: 2,
        min_counterpart: 2,
        max_counterpart: None,
    },
];

pub fn current_protocol() -> ProtocolEntry {
    PROTOCOL_TABLE[PROTOCOL_TABLE.len() - 1]
}

/// Pick the latest entry that accepts `counterpart`.
pub fn negotiate(counterpart: u32) -> Result<ProtocolEntry, BridgeError> {
    PROTOCOL_TABLE
        .iter()
        .rev()
        .find(|entry| entry.accepts(counterpart))
        .copied()
        .ok_or_else(|| BridgeError::ProtocolMismatch(counterpart.to_string()))
}
