//! Update: lockstep walk of next/prev pairs.

use super::{branch_at, Walker};
use crate::error::AgentError;
use crate::host::HostTree;
use crate::ops::Operation;
use crate::types::{NodeRef, StableId};
use std::collections::HashSet;

impl Walker {
    /// Diff `next` against its previous version `prev`.
    ///
    /// Returns true when the child list of the nearest included ancestor
    /// has to be re-checked, which happens when `next` is filtered and its
    /// own visible children moved.
    pub(super) fn update_subtree(
        &mut self,
        tree: &dyn HostTree,
        next: NodeRef,
        prev: NodeRef,
        parent: Option<StableId>,
        parent_mode: u32,
    ) -> Result<bool, AgentError> {
        let id = self.registry.get_or_assign(tree, next)?;
        self.unmounted.remove(&id);

        let included = !self.is_filtered(tree, next);
        let (child_parent, child_mode) = if included {
            let mode = tree.subtree_mode(next);
            if mode != tree.subtree_mode(prev) {
                self.encoder.push_op(Operation::SetSubtreeMode { id, mode });
            }
            (Some(id), mode)
        } else {
            (parent, parent_mode)
        };

        let should_reset = if self.kind_of(tree, next).is_collapsible() {
            self.update_collapsible(tree, next, prev, child_parent, child_mode)?
        } else {
            self.update_children(
                tree,
                tree.children(next),
                tree.children(prev),
                child_parent,
                child_mode,
            )?
        };

        if !included {
            return Ok(should_reset);
        }
        self.record_durations(tree, next, Some(prev), id);
        if should_reset {
            self.reorder_if_changed(tree, next, prev, id);
        }
        Ok(false)
    }

    /// Walk matching child pairs, mount new children and unmount dropped
    /// ones. Returns true if the child sequence may have changed.
    fn update_children(
        &mut self,
        tree: &dyn HostTree,
        next_children: &[NodeRef],
        prev_children: &[NodeRef],
        parent: Option<StableId>,
        parent_mode: u32,
    ) -> Result<bool, AgentError> {
        if next_children == prev_children {
            return Ok(false);
        }

        let prev_set: HashSet<NodeRef> = prev_children.iter().copied().collect();
        let mut matched = HashSet::with_capacity(prev_children.len());
        let mut should_reset = next_children.len() != prev_children.len();

        for (index, &child) in next_children.iter().enumerate() {
            let prev_child = if prev_set.contains(&child) {
                Some(child)
            } else {
                tree.alternate(child).filter(|alt| prev_set.contains(alt))
            };
            match prev_child {
                // Same node in both lists: the host skipped this subtree.
                Some(prev_child) if prev_child == child => {}
                Some(prev_child) => {
                    if self.update_subtree(tree, child, prev_child, parent, parent_mode)? {
                        should_reset = true;
                    }
                }
                None => {
                    self.mount_subtree(tree, child, parent, parent_mode)?;
                    should_reset = true;
                }
            }
            if let Some(prev_child) = prev_child {
                matched.insert(prev_child);
                if prev_children.get(index) != Some(&prev_child) {
                    should_reset = true;
                }
            }
        }

        for &dropped in prev_children.iter().filter(|c| !matched.contains(*c)) {
            self.unmount_real(tree, dropped);
            should_reset = true;
        }
        Ok(should_reset)
    }

    fn update_collapsible(
        &mut self,
        tree: &dyn HostTree,
        next: NodeRef,
        prev: NodeRef,
        parent: Option<StableId>,
        parent_mode: u32,
    ) -> Result<bool, AgentError> {
        let next_children = tree.children(next);
        let prev_children = tree.children(prev);
        match (tree.shows_fallback(prev), tree.shows_fallback(next)) {
            (false, false) => self.update_children(
                tree,
                branch_at(next_children, 0),
                branch_at(prev_children, 0),
                parent,
                parent_mode,
            ),
            (true, true) => self.update_children(
                tree,
                branch_at(next_children, 1),
                branch_at(prev_children, 1),
                parent,
                parent_mode,
            ),
            (false, true) => {
                // Primary content is hidden, not destroyed.
                if let Some(&primary) = prev_children.first() {
                    self.unmount_simulated(tree, primary);
                }
                if let Some(&fallback) = next_children.get(1) {
                    self.mount_subtree(tree, fallback, parent, parent_mode)?;
                }
                Ok(true)
            }
            (true, false) => {
                if let Some(&fallback) = prev_children.get(1) {
                    self.unmount_real(tree, fallback);
                }
                if let Some(&primary) = next_children.first() {
                    self.mount_subtree(tree, primary, parent, parent_mode)?;
                }
                Ok(true)
            }
        }
    }

    /// Emit `REORDER` only if the visible children differ from what the
    /// mirror will hold once this flush's removals and additions apply:
    /// survivors in their previous order followed by new children.
    fn reorder_if_changed(
        &mut self,
        tree: &dyn HostTree,
        next: NodeRef,
        prev: NodeRef,
        id: StableId,
    ) {
        let next_ids = self.visible_child_ids(tree, next);
        let prev_ids = if prev == next {
            Vec::new()
        } else {
            self.visible_child_ids(tree, prev)
        };
        let next_set: HashSet<StableId> = next_ids.iter().copied().collect();
        let prev_set: HashSet<StableId> = prev_ids.iter().copied().collect();

        let expected = prev_ids
            .iter()
            .filter(|id| next_set.contains(*id))
            .chain(next_ids.iter().filter(|id| !prev_set.contains(*id)));
        if next_ids.iter().ne(expected) {
            self.encoder.push_op(Operation::Reorder {
                id,
                children: next_ids,
            });
        }
    }
}
