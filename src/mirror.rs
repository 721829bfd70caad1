//! Inspector-side mirror
//!
//! Applies decoded operation messages to a replica of each source's
//! visible tree and rejects streams that break the ordering contract.
//! Operations are applied in order; a rejected message may leave the
//! operations before the failing one applied.

use crate::error::MirrorError;
use crate::host::ElementType;
use crate::ops::{decode_operations, DecodedMessage, Operation};
use crate::types::{SourceId, StableId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorNode {
    pub id: StableId,
    pub element_type: ElementType,
    pub parent_id: Option<StableId>,
    pub owner_id: Option<StableId>,
    pub display_name: Option<String>,
    pub key: Option<String>,
    pub children: Vec<StableId>,
    pub subtree_mode: u32,
    pub tree_base_duration: u32,
    pub errors: u32,
    pub warnings: u32,
}

impl MirrorNode {
    fn new(id: StableId, element_type: ElementType, parent_id: Option<StableId>) -> Self {
        Self {
            id,
            element_type,
            parent_id,
            owner_id: None,
            display_name: None,
            key: None,
            children: Vec::new(),
            subtree_mode: 0,
            tree_base_duration: 0,
            errors: 0,
            warnings: 0,
        }
    }
}

#[derive(Debug, Default)]
struct SourceMirror {
    nodes: HashMap<StableId, MirrorNode>,
    roots: Vec<StableId>,
}

#[derive(Debug, Default)]
pub struct MirrorTree {
    sources: BTreeMap<SourceId, SourceMirror>,
}

impl MirrorTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and apply one operations payload.
    pub fn apply(&mut self, payload: &[u32]) -> Result<(), MirrorError> {
        let message = decode_operations(payload)?;
        self.apply_decoded(&message)
    }

    pub fn apply_decoded(&mut self, message: &DecodedMessage) -> Result<(), MirrorError> {
        let source_id = message.source_id;
        let mirror = self.sources.entry(source_id).or_default();
        for op in &message.operations {
            trace!(source_id, op = op.name(), "apply");
            mirror.apply(source_id, message, op)?;
        }
        Ok(())
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        self.sources.keys().copied().collect()
    }

    pub fn roots(&self, source_id: SourceId) -> &[StableId] {
        self.sources
            .get(&source_id)
            .map(|mirror| mirror.roots.as_slice())
            .unwrap_or(&[])
    }

    pub fn node(&self, source_id: SourceId, id: StableId) -> Option<&MirrorNode> {
        self.sources.get(&source_id)?.nodes.get(&id)
    }

    pub fn children(&self, source_id: SourceId, id: StableId) -> &[StableId] {
        self.node(source_id, id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Number of nodes mirrored for `source_id`, roots included.
    pub fn len(&self, source_id: SourceId) -> usize {
        self.sources
            .get(&source_id)
            .map_or(0, |mirror| mirror.nodes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.sources.values().all(|mirror| mirror.nodes.is_empty())
    }

    /// Every node of `source_id` in pre-order with its depth.
    pub fn walk(&self, source_id: SourceId) -> Vec<(usize, &MirrorNode)> {
        let Some(mirror) = self.sources.get(&source_id) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(mirror.nodes.len());
        let mut stack: Vec<(usize, StableId)> =
            mirror.roots.iter().rev().map(|root| (0, *root)).collect();
        while let Some((depth, id)) = stack.pop() {
            let Some(node) = mirror.nodes.get(&id) else {
                continue;
            };
            out.push((depth, node));
            stack.extend(node.children.iter().rev().map(|child| (depth + 1, *child)));
        }
        out
    }
}

impl SourceMirror {
    fn node_mut(
        &mut self,
        source_id: SourceId,
        id: StableId,
        op: &'static str,
    ) -> Result<&mut MirrorNode, MirrorError> {
        self.nodes
            .get_mut(&id)
            .ok_or(MirrorError::UnknownNode { source_id, id, op })
    }

    fn apply(
        &mut self,
        source_id: SourceId,
        message: &DecodedMessage,
        op: &Operation,
    ) -> Result<(), MirrorError> {
        match op {
            Operation::AddRoot { id, .. } => {
                if self.nodes.contains_key(id) {
                    return Err(MirrorError::DuplicateAdd { source_id, id: *id });
                }
                self.nodes
                    .insert(*id, MirrorNode::new(*id, ElementType::Root, None));
                self.roots.push(*id);
            }
            Operation::Add {
                id,
                element_type,
                parent_id,
                owner_id,
                name_id,
                key_id,
            } => {
                if self.nodes.contains_key(id) {
                    return Err(MirrorError::DuplicateAdd { source_id, id: *id });
                }
                let display_name = message.string(*name_id)?.map(str::to_string);
                let key = message.string(*key_id)?.map(str::to_string);
                let parent = self
                    .nodes
                    .get_mut(parent_id)
                    .ok_or(MirrorError::UnknownParent {
                        source_id,
                        id: *id,
                        parent: *parent_id,
                    })?;
                parent.children.push(*id);
                let mut node = MirrorNode::new(*id, *element_type, Some(*parent_id));
                node.owner_id = *owner_id;
                node.display_name = display_name;
                node.key = key;
                self.nodes.insert(*id, node);
            }
            Operation::Remove { ids } => {
                for id in ids {
                    self.remove_node(source_id, *id)?;
                }
            }
            Operation::RemoveRoot => {
                let root = message.root_id;
                if !self.roots.contains(&root) {
                    return Err(MirrorError::UnknownRoot { source_id, root });
                }
                if self.nodes.get(&root).is_some_and(|n| !n.children.is_empty()) {
                    return Err(MirrorError::RemoveWithChildren { source_id, id: root });
                }
                self.nodes.remove(&root);
                self.roots.retain(|r| *r != root);
            }
            Operation::Reorder { id, children } => {
                let node = self.node_mut(source_id, *id, "REORDER")?;
                let current: HashSet<&StableId> = node.children.iter().collect();
                let proposed: HashSet<&StableId> = children.iter().collect();
                if current != proposed || children.len() != node.children.len() {
                    return Err(MirrorError::ReorderMismatch { source_id, id: *id });
                }
                node.children = children.clone();
            }
            Operation::SetSubtreeMode { id, mode } => {
                self.node_mut(source_id, *id, "SET_SUBTREE_MODE")?.subtree_mode = *mode;
            }
            Operation::UpdateDuration { id, duration } => {
                self.node_mut(source_id, *id, "UPDATE_DURATION")?
                    .tree_base_duration = *duration;
            }
            Operation::UpdateErrorWarningCounts {
                id,
                errors,
                warnings,
            } => {
                let node = self.node_mut(source_id, *id, "UPDATE_ERROR_WARNING_COUNTS")?;
                node.errors = *errors;
                node.warnings = *warnings;
            }
        }
        Ok(())
    }

    fn remove_node(&mut self, source_id: SourceId, id: StableId) -> Result<(), MirrorError> {
        let node = self.nodes.get(&id).ok_or(MirrorError::UnknownNode {
            source_id,
            id,
            op: "REMOVE",
        })?;
        if !node.children.is_empty() {
            return Err(MirrorError::RemoveWithChildren { source_id, id });
        }
        if let Some(parent) = node.parent_id.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != id);
        }
        self.nodes.remove(&id);
        Ok(())
    }
}
