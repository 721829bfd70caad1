//! Structural paths for selection persistence.
//!
//! Stable ids do not survive a reload, so a selection is remembered as the
//! chain of `{displayName, key, index}` frames from its root. Roots are
//! named by a pseudo-key `Name:n` derived from their first named node.

use super::Walker;
use crate::host::{HostTree, NodeKind};
use crate::types::{NodeRef, StableId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathFrame {
    pub display_name: Option<String>,
    pub key: Option<String>,
    pub index: usize,
}

/// Deepest node a stored path resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMatch {
    pub id: StableId,
    pub is_full_match: bool,
}

impl Walker {
    pub(super) fn assign_root_key(&mut self, tree: &dyn HostTree, root: NodeRef, id: StableId) {
        if self.root_keys.contains_key(&id) {
            return;
        }
        let name = self
            .first_display_name(tree, root)
            .unwrap_or_else(|| "Unknown".to_string());
        let count = self.root_key_counts.entry(name.clone()).or_insert(0);
        let key = format!("{name}:{count}");
        *count += 1;
        self.root_keys.insert(id, key);
    }

    pub(super) fn release_root_key(&mut self, id: StableId) {
        let Some(key) = self.root_keys.remove(&id) else {
            return;
        };
        let name = key.rsplit_once(':').map(|(name, _)| name).unwrap_or(&key);
        if let Some(count) = self.root_key_counts.get_mut(name) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.root_key_counts.remove(name);
            }
        }
    }

    pub fn root_key(&self, id: StableId) -> Option<&str> {
        self.root_keys.get(&id).map(String::as_str)
    }

    fn first_display_name(&self, tree: &dyn HostTree, root: NodeRef) -> Option<String> {
        let mut stack: Vec<NodeRef> = self.active_children(tree, root).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if let Some(name) = tree.display_name(node) {
                return Some(name.to_string());
            }
            stack.extend(self.active_children(tree, node).iter().rev());
        }
        None
    }

    /// Frames from the root down to `id`, or `None` if the node is gone.
    pub fn path_for_id(&self, tree: &dyn HostTree, id: StableId) -> Option<Vec<PathFrame>> {
        let node = self.node_for_id(tree, id)?;

        let mut chain = Vec::new();
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if !self.is_filtered(tree, current) {
                chain.push(self.registry.get(tree, current)?);
            }
            cursor = tree.parent(current);
        }
        chain.reverse();

        let (&root_id, rest) = chain.split_first()?;
        let root = self.registry.current_node_for(tree, root_id)?;
        if self.kind_of(tree, root) != NodeKind::Root {
            return None;
        }
        let mut frames = vec![PathFrame {
            display_name: Some(self.root_key(root_id)?.to_string()),
            key: None,
            index: 0,
        }];

        let mut parent = root;
        for &child_id in rest {
            let siblings = self.visible_child_ids(tree, parent);
            let index = siblings.iter().position(|sibling| *sibling == child_id)?;
            let child = self.registry.current_node_for(tree, child_id)?;
            frames.push(PathFrame {
                display_name: tree.display_name(child).map(str::to_string),
                key: tree.key(child).map(str::to_string),
                index,
            });
            parent = child;
        }
        Some(frames)
    }

    /// Resolve stored frames against the live tree. Stops at the deepest
    /// frame that still matches.
    pub fn resolve_path(&self, tree: &dyn HostTree, frames: &[PathFrame]) -> Option<PathMatch> {
        let (first, rest) = frames.split_first()?;
        let root_key = first.display_name.as_deref()?;
        let mut current = tree.roots().into_iter().find(|root| {
            self.registry
                .get(tree, *root)
                .and_then(|id| self.root_key(id))
                == Some(root_key)
        })?;

        let mut is_full_match = true;
        for frame in rest {
            let children = self.visible_children(tree, current);
            let matches = |node: &NodeRef| {
                tree.display_name(*node) == frame.display_name.as_deref()
                    && tree.key(*node) == frame.key.as_deref()
            };
            let found = children
                .get(frame.index)
                .filter(|node| matches(node))
                .or_else(|| children.iter().find(|node| matches(node)));
            match found {
                Some(&node) => current = node,
                None => {
                    is_full_match = false;
                    break;
                }
            }
        }
        Some(PathMatch {
            id: self.registry.get(tree, current)?,
            is_full_match,
        })
    }
}
