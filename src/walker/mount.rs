//! Mount: depth-first pre-order, one `ADD` per included node.

use super::Walker;
use crate::error::AgentError;
use crate::host::{HostTree, NodeKind};
use crate::ops::{duration_to_wire, Operation};
use crate::types::{NodeRef, StableId};
use tracing::warn;

impl Walker {
    /// Mount `node` and its active subtree under the nearest included
    /// ancestor `parent` whose subtree mode is `parent_mode`.
    pub(super) fn mount_subtree(
        &mut self,
        tree: &dyn HostTree,
        node: NodeRef,
        parent: Option<StableId>,
        parent_mode: u32,
    ) -> Result<(), AgentError> {
        let id = self.registry.get_or_assign(tree, node)?;
        self.unmounted.remove(&id);

        let included = !self.is_filtered(tree, node);
        let (child_parent, child_mode) = if included {
            self.record_mount(tree, node, id, parent, parent_mode);
            (Some(id), tree.subtree_mode(node))
        } else {
            (parent, parent_mode)
        };

        for &child in self.active_children(tree, node) {
            self.mount_subtree(tree, child, child_parent, child_mode)?;
        }

        if included {
            self.record_durations(tree, node, None, id);
        }
        Ok(())
    }

    fn record_mount(
        &mut self,
        tree: &dyn HostTree,
        node: NodeRef,
        id: StableId,
        parent: Option<StableId>,
        parent_mode: u32,
    ) {
        let kind = self.kind_of(tree, node);
        if kind == NodeKind::Root {
            self.encoder.push_op(Operation::AddRoot {
                id,
                flags: self.capabilities.root_flags(),
            });
            self.mounted_roots.insert(id);
            self.assign_root_key(tree, node, id);
        } else {
            let Some(parent_id) = parent.or(self.current_root) else {
                warn!(%node, %id, "node mounted without an included ancestor");
                return;
            };
            let owner_id = tree
                .owner(node)
                .and_then(|owner| self.registry.get(tree, owner));
            let name_id = self.encoder.intern(tree.display_name(node));
            let key_id = self.encoder.intern(tree.key(node));
            self.encoder.push_op(Operation::Add {
                id,
                element_type: kind.element_type(),
                parent_id,
                owner_id,
                name_id,
                key_id,
            });
        }

        let mode = tree.subtree_mode(node);
        if mode != parent_mode {
            self.encoder.push_op(Operation::SetSubtreeMode { id, mode });
        }
    }

    /// Send the tree base duration when it is new or changed, and collect
    /// per-commit timings while profiling.
    pub(super) fn record_durations(
        &mut self,
        tree: &dyn HostTree,
        node: NodeRef,
        prev: Option<NodeRef>,
        id: StableId,
    ) {
        if !self.capabilities.supports_profiling {
            return;
        }
        let Some(durations) = tree.durations(node) else {
            return;
        };
        let duration = duration_to_wire(durations.tree_base_ms);
        let previous = prev
            .and_then(|prev| tree.durations(prev))
            .map(|prev| duration_to_wire(prev.tree_base_ms));
        if previous != Some(duration) {
            self.encoder
                .push_op(Operation::UpdateDuration { id, duration });
        }
        if durations.did_render && self.profiling.is_active() {
            self.profiling.record(id, &durations);
            self.encoder.mark_profiling_data();
        }
    }
}
