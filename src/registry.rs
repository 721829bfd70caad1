//! Identity Registry
//!
//! Maps host nodes to [`StableId`]s. A node and its alternate always resolve
//! to the same id. Removal is deferred: `untrack` only marks nodes, and a
//! single sweep after the grace delay releases everything still marked, so
//! messages already in flight keep referencing valid ids.

use crate::error::RegistryError;
use crate::host::HostTree;
use crate::ticker::Ticker;
use crate::types::{NodeRef, StableId};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Default grace delay before untracked ids are released.
pub const DEFAULT_UNTRACK_DELAY_MS: u64 = 1000;

pub struct IdentityRegistry {
    next_id: u32,
    node_to_id: HashMap<NodeRef, StableId>,
    id_to_nodes: HashMap<StableId, Vec<NodeRef>>,
    pending_untrack: HashSet<NodeRef>,
    sweep: Ticker,
    untrack_delay_ms: u64,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_UNTRACK_DELAY_MS)
    }
}

impl IdentityRegistry {
    pub fn new(untrack_delay_ms: u64) -> Self {
        Self {
            next_id: 1,
            node_to_id: HashMap::new(),
            id_to_nodes: HashMap::new(),
            pending_untrack: HashSet::new(),
            sweep: Ticker::new(),
            untrack_delay_ms,
        }
    }

    /// Resolve the id for `node`, assigning a fresh one on first observation.
    ///
    /// Lookup goes through the node first, then its alternate. Finding two
    /// different ids for the pair is an internal invariant violation.
    pub fn get_or_assign(
        &mut self,
        tree: &dyn HostTree,
        node: NodeRef,
    ) -> Result<StableId, RegistryError> {
        let alternate = tree.alternate(node);
        let own = self.node_to_id.get(&node).copied();
        let via_alternate = alternate.and_then(|alt| self.node_to_id.get(&alt).copied());

        let id = match (own, via_alternate) {
            (Some(existing), Some(other)) if existing != other => {
                return Err(RegistryError::IdConflict {
                    node,
                    alternate: alternate.unwrap_or(node),
                    existing,
                    other,
                });
            }
            (Some(id), _) | (None, Some(id)) => id,
            (None, None) => {
                let id = StableId::new(self.next_id);
                self.next_id += 1;
                trace!(%node, %id, "assigned stable id");
                id
            }
        };

        if self.node_to_id.insert(node, id).is_none() {
            self.id_to_nodes.entry(id).or_default().push(node);
        }
        self.pending_untrack.remove(&node);
        if let Some(alt) = alternate {
            self.pending_untrack.remove(&alt);
        }
        Ok(id)
    }

    /// Look up an id without assigning. `None` is the sentinel for nodes the
    /// registry never saw or has already released.
    pub fn get(&self, tree: &dyn HostTree, node: NodeRef) -> Option<StableId> {
        self.node_to_id.get(&node).copied().or_else(|| {
            tree.alternate(node)
                .and_then(|alt| self.node_to_id.get(&alt).copied())
        })
    }

    /// One of the nodes currently carrying `id`.
    pub fn node_for(&self, id: StableId) -> Option<NodeRef> {
        self.id_to_nodes
            .get(&id)
            .and_then(|nodes| nodes.first().copied())
    }

    /// Resolve `id` to whichever buffer of the pair is attached to the
    /// host's current tree.
    pub fn current_node_for(&self, tree: &dyn HostTree, id: StableId) -> Option<NodeRef> {
        let node = self.node_for(id)?;
        let roots = tree.roots();
        let reaches_root = |mut candidate: NodeRef| loop {
            if roots.contains(&candidate) {
                return true;
            }
            match tree.parent(candidate) {
                Some(parent) => candidate = parent,
                None => return false,
            }
        };
        match tree.alternate(node) {
            Some(alt) if !reaches_root(node) && reaches_root(alt) => Some(alt),
            _ => Some(node),
        }
    }

    /// Mark `node` (and its alternate) for release after the grace delay.
    /// Unknown nodes are ignored.
    pub fn untrack(&mut self, tree: &dyn HostTree, node: NodeRef, now: u64) {
        if self.get(tree, node).is_none() {
            return;
        }
        self.pending_untrack.insert(node);
        if let Some(alt) = tree.alternate(node) {
            self.pending_untrack.insert(alt);
        }
        self.sweep.arm_if_idle(now + self.untrack_delay_ms);
    }

    pub fn is_pending_untrack(&self, tree: &dyn HostTree, node: NodeRef) -> bool {
        self.pending_untrack.contains(&node)
            || tree
                .alternate(node)
                .map(|alt| self.pending_untrack.contains(&alt))
                .unwrap_or(false)
    }

    /// Release every marked node if the sweep deadline has passed.
    ///
    /// Returns the ids that stopped being tracked.
    pub fn sweep(&mut self, now: u64) -> Vec<StableId> {
        if !self.sweep.take_due(now) {
            return Vec::new();
        }
        self.release_pending()
    }

    /// Release every marked node immediately.
    pub fn release_pending(&mut self) -> Vec<StableId> {
        self.sweep.cancel();
        let pending: Vec<NodeRef> = self.pending_untrack.drain().collect();
        let mut released = Vec::new();
        for node in pending {
            let Some(id) = self.node_to_id.remove(&node) else {
                continue;
            };
            if let Some(nodes) = self.id_to_nodes.get_mut(&id) {
                nodes.retain(|bound| *bound != node);
                if nodes.is_empty() {
                    self.id_to_nodes.remove(&id);
                    released.push(id);
                }
            }
        }
        released.sort();
        debug!(released = released.len(), "released untracked ids");
        released
    }

    pub fn deadline(&self) -> Option<u64> {
        self.sweep.deadline()
    }

    /// Number of ids currently tracked.
    pub fn len(&self) -> usize {
        self.id_to_nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_nodes.is_empty()
    }
}
