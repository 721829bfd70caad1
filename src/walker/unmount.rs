//! Unmount handling.
//!
//! Real unmounts are detected parent-first; the encoder reverses them so
//! the mirror sees children removed before parents. Simulated unmounts
//! (hidden content) are detected post-order and sent as detected.

use super::Walker;
use crate::host::{HostTree, NodeKind};
use crate::types::NodeRef;
use tracing::trace;

impl Walker {
    /// The subtree rooted at `node` left the host tree.
    pub(super) fn unmount_real(&mut self, tree: &dyn HostTree, node: NodeRef) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            self.record_unmount(tree, current, false);
            stack.extend(self.active_children(tree, current).iter().rev());
        }
    }

    /// The subtree rooted at `node` is still in the host tree but no longer
    /// shown.
    pub(super) fn unmount_simulated(&mut self, tree: &dyn HostTree, node: NodeRef) {
        for &child in self.active_children(tree, node) {
            self.unmount_simulated(tree, child);
        }
        self.record_unmount(tree, node, true);
    }

    /// Remove a root's previous content, then the root itself.
    pub(super) fn unmount_root(&mut self, tree: &dyn HostTree, root: NodeRef, prev: NodeRef) {
        for &child in self.active_children(tree, prev) {
            self.unmount_real(tree, child);
        }
        if prev != root {
            for &child in self.active_children(tree, root) {
                self.unmount_real(tree, child);
            }
        }
        self.record_unmount(tree, root, false);
    }

    /// Record one node. Filtered nodes release their id but send nothing;
    /// nodes already reported are skipped.
    pub(super) fn record_unmount(&mut self, tree: &dyn HostTree, node: NodeRef, simulated: bool) {
        let Some(id) = self.registry.get(tree, node) else {
            trace!(%node, "unmount of untracked node");
            return;
        };
        if !self.unmounted.insert(id) {
            return;
        }
        if !self.is_filtered(tree, node) {
            if self.kind_of(tree, node) == NodeKind::Root {
                self.encoder.record_root_removal(id);
                self.mounted_roots.remove(&id);
                self.release_root_key(id);
            } else {
                self.encoder.record_unmount(id, simulated);
            }
        }
        let now = self.now();
        self.registry.untrack(tree, node, now);
    }
}
