//! Identifier types shared by every layer of the agent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier the host assigns to an attached tree provider.
pub type SourceId = u32;

/// Process-unique identity of a host node, stable across alternate swaps.
///
/// Zero is never assigned; on the wire it stands for "no node" (root parent,
/// missing owner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(u32);

impl StableId {
    pub const fn new(raw: u32) -> Self {
        StableId(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a node inside the host's arena.
///
/// Identity comparison between host nodes is index comparison. A node and its
/// alternate are two distinct indices linked by `HostTree::alternate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRef(pub u32);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Wire value for "no id".
pub const NO_ID: u32 = 0;

/// Flattens an optional id to its wire form.
pub fn wire_id(id: Option<StableId>) -> u32 {
    id.map(StableId::get).unwrap_or(NO_ID)
}
