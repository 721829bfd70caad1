//! Tree Walker / Differ
//!
//! One [`Walker`] per supported provider. It owns that provider's identity
//! registry, operation encoder and filters, and turns host commit callbacks
//! into operation messages. All host reads happen synchronously inside the
//! callback that lends the tree.

mod console;
mod filters;
mod inspect;
mod mount;
mod path;
mod profiling;
mod unmount;
mod update;

pub use console::ConsoleLevel;
pub use filters::{
    default_filters, is_hoc_display_name, split_hoc_names, ComponentFilter, FilterSet,
    FilterSubject,
};
pub use inspect::{InspectedNode, OwnerEntry};
pub use path::{PathFrame, PathMatch};
pub use profiling::{CommitProfile, NodeTiming, ProfilingData};

use crate::clock::Clock;
use crate::error::AgentError;
use crate::host::{HostTree, KindTable, NodeKind};
use crate::ops::{root_flags, OperationEncoder};
use crate::registry::{IdentityRegistry, DEFAULT_UNTRACK_DELAY_MS};
use crate::ticker::earliest;
use crate::types::{NodeRef, SourceId, StableId, NO_ID};
use console::ConsoleCounts;
use profiling::ProfilingState;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Capability flags a provider declares at attach time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub supports_profiling: bool,
    #[serde(default)]
    pub strict_mode_compliant: bool,
    #[serde(default)]
    pub has_owner_metadata: bool,
}

impl Capabilities {
    /// Flags carried by `ADD_ROOT`.
    pub fn root_flags(&self) -> u32 {
        let mut flags = 0;
        if self.strict_mode_compliant {
            flags |= root_flags::STRICT_MODE_COMPLIANT;
        }
        if self.supports_profiling {
            flags |= root_flags::SUPPORTS_PROFILING;
        }
        if self.has_owner_metadata {
            flags |= root_flags::HAS_OWNER_METADATA;
        }
        flags
    }
}

/// Timer settings for one walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkerOptions {
    pub untrack_delay_ms: u64,
    pub aggregation_delay_ms: u64,
}

impl Default for WalkerOptions {
    fn default() -> Self {
        Self {
            untrack_delay_ms: DEFAULT_UNTRACK_DELAY_MS,
            aggregation_delay_ms: 1000,
        }
    }
}

/// Result of one `on_commit_end`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Encoded operations message, absent when nothing changed.
    pub message: Option<Vec<u32>>,
    /// Set when this commit added the root to the mirror.
    pub mounted_root: Option<StableId>,
}

#[derive(Debug, Clone, Copy)]
struct CommitInfo {
    priority: Option<u32>,
    started_at: u64,
}

pub struct Walker {
    source_id: SourceId,
    kinds: KindTable,
    capabilities: Capabilities,
    clock: Arc<dyn Clock>,
    registry: IdentityRegistry,
    encoder: OperationEncoder,
    filters: FilterSet,
    mounted_roots: HashSet<StableId>,
    root_keys: HashMap<StableId, String>,
    root_key_counts: HashMap<String, u32>,
    /// Ids already reported as removed; makes unmount handling idempotent.
    unmounted: HashSet<StableId>,
    current_root: Option<StableId>,
    last_root: Option<StableId>,
    commit: Option<CommitInfo>,
    profiling: ProfilingState,
    console: ConsoleCounts,
}

impl Walker {
    pub fn new(
        source_id: SourceId,
        kinds: KindTable,
        capabilities: Capabilities,
        filters: &[ComponentFilter],
        options: WalkerOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source_id,
            kinds,
            capabilities,
            clock,
            registry: IdentityRegistry::new(options.untrack_delay_ms),
            encoder: OperationEncoder::new(),
            filters: FilterSet::compile(filters),
            mounted_roots: HashSet::new(),
            root_keys: HashMap::new(),
            root_key_counts: HashMap::new(),
            unmounted: HashSet::new(),
            current_root: None,
            last_root: None,
            commit: None,
            profiling: ProfilingState::default(),
            console: ConsoleCounts::new(options.aggregation_delay_ms),
        }
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn schema_version(&self) -> u32 {
        self.kinds.schema_version()
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn is_root_mounted(&self, id: StableId) -> bool {
        self.mounted_roots.contains(&id)
    }

    pub fn on_commit_start(&mut self, priority: Option<u32>) {
        self.commit = Some(CommitInfo {
            priority,
            started_at: self.clock.now_ms(),
        });
    }

    /// Reconcile `root` against what the mirror holds and flush.
    pub fn on_commit_end(
        &mut self,
        tree: &dyn HostTree,
        root: NodeRef,
    ) -> Result<CommitOutcome, AgentError> {
        let root_id = self.registry.get_or_assign(tree, root)?;
        self.current_root = Some(root_id);

        let was_mounted = self.mounted_roots.contains(&root_id);
        let is_mounted = tree.root_has_content(root);
        let prev = tree.alternate(root).unwrap_or(root);
        let mut mounted_root = None;

        match (was_mounted, is_mounted) {
            (false, true) => {
                self.mount_subtree(tree, root, None, 0)?;
                mounted_root = Some(root_id);
            }
            (true, true) => {
                self.update_subtree(tree, root, prev, None, 0)?;
            }
            (true, false) => self.unmount_root(tree, root, prev),
            (false, false) => {}
        }

        if let Some(commit) = self.commit.take() {
            if self.profiling.is_active() {
                self.profiling
                    .finish_commit(commit.priority, commit.started_at, self.clock.now_ms());
                self.encoder.mark_profiling_data();
            }
        }

        let message = self.encoder.flush(self.source_id, root_id);
        self.last_root = Some(root_id);
        self.current_root = None;
        Ok(CommitOutcome {
            message,
            mounted_root,
        })
    }

    /// The host removed the subtree rooted at `node`.
    ///
    /// A removed subtree is recorded and sent with the next flush. A removed
    /// root is flushed right away, in a message addressed to that root.
    pub fn on_node_unmounted(&mut self, tree: &dyn HostTree, node: NodeRef) -> Option<Vec<u32>> {
        if self.kind_of(tree, node) != NodeKind::Root {
            self.unmount_real(tree, node);
            return None;
        }
        let prev = tree.alternate(node).unwrap_or(node);
        self.unmount_root(tree, node, prev);
        self.flush_pending()
    }

    /// Retract every mounted root, swap filters, remount. Anything already
    /// buffered goes out first in its own message, then one message per
    /// retraction and per remount.
    pub fn set_filters(
        &mut self,
        tree: &dyn HostTree,
        filters: &[ComponentFilter],
    ) -> Result<Vec<Vec<u32>>, AgentError> {
        let mut messages: Vec<Vec<u32>> = self.flush_pending().into_iter().collect();
        let roots = tree.roots();

        for &root in &roots {
            let Some(root_id) = self.registry.get(tree, root) else {
                continue;
            };
            if !self.mounted_roots.contains(&root_id) {
                continue;
            }
            self.current_root = Some(root_id);
            for &child in self.active_children(tree, root) {
                self.unmount_simulated(tree, child);
            }
            self.record_unmount(tree, root, true);
            messages.extend(self.encoder.flush(self.source_id, root_id));
        }

        self.filters = FilterSet::compile(filters);
        messages.extend(self.remount(tree)?);
        debug!(
            source_id = self.source_id,
            messages = messages.len(),
            "filters replaced"
        );
        Ok(messages)
    }

    /// Mount every root with content that the mirror does not hold yet.
    /// One message per root.
    pub fn remount(&mut self, tree: &dyn HostTree) -> Result<Vec<Vec<u32>>, AgentError> {
        let mut messages = Vec::new();
        for root in tree.roots() {
            if !tree.root_has_content(root) {
                continue;
            }
            let root_id = self.registry.get_or_assign(tree, root)?;
            if self.mounted_roots.contains(&root_id) {
                continue;
            }
            self.current_root = Some(root_id);
            self.mount_subtree(tree, root, None, 0)?;
            messages.extend(self.encoder.flush(self.source_id, root_id));
        }
        self.current_root = None;
        Ok(messages)
    }

    /// The inspector lost this provider's messages: treat every root as
    /// never mounted so the next commit or `remount` sends it whole.
    /// Ids are kept.
    pub fn forget_mirror(&mut self) {
        self.encoder.clear();
        self.mounted_roots.clear();
        self.root_keys.clear();
        self.root_key_counts.clear();
        debug!(source_id = self.source_id, "mirror state forgotten");
    }

    /// Resolve an id to its live node. `None` when the node is gone.
    pub fn node_for_id(&self, tree: &dyn HostTree, id: StableId) -> Option<NodeRef> {
        if self.unmounted.contains(&id) {
            return None;
        }
        self.registry.current_node_for(tree, id)
    }

    /// Run due timers: registry sweep and error/warning aggregation.
    pub fn tick(&mut self, now: u64) -> Vec<Vec<u32>> {
        for id in self.registry.sweep(now) {
            self.unmounted.remove(&id);
            self.console.forget(id);
        }
        let mut messages = Vec::new();
        if self.console.take_due(now) {
            messages.extend(self.flush_console());
        }
        messages
    }

    pub fn next_deadline(&self) -> Option<u64> {
        earliest([self.registry.deadline(), self.console.deadline()])
    }

    /// Flush whatever is buffered outside a commit.
    fn flush_pending(&mut self) -> Option<Vec<u32>> {
        let root = self.fallback_root();
        self.encoder.flush(self.source_id, root)
    }

    /// Root id used when a flush is not tied to a commit.
    fn fallback_root(&self) -> StableId {
        self.current_root
            .or(self.last_root)
            .unwrap_or(StableId::new(NO_ID))
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    fn kind_of(&self, tree: &dyn HostTree, node: NodeRef) -> NodeKind {
        self.kinds.kind_of(tree.kind(node))
    }

    fn is_filtered(&self, tree: &dyn HostTree, node: NodeRef) -> bool {
        self.filters.is_filtered(FilterSubject {
            kind: self.kind_of(tree, node),
            key: tree.key(node),
            display_name: tree.display_name(node),
            source_location: tree.source_location(node),
        })
    }

    /// Children walked for `node`: a collapsible node exposes only the
    /// branch currently shown.
    fn active_children<'t>(&self, tree: &'t dyn HostTree, node: NodeRef) -> &'t [NodeRef] {
        let children = tree.children(node);
        if !self.kind_of(tree, node).is_collapsible() {
            return children;
        }
        let branch = usize::from(tree.shows_fallback(node));
        branch_at(children, branch)
    }

    /// Included children of `node` with filtered hops flattened away.
    fn visible_children(&self, tree: &dyn HostTree, node: NodeRef) -> Vec<NodeRef> {
        let mut visible = Vec::new();
        let mut stack: Vec<NodeRef> = self.active_children(tree, node).iter().rev().copied().collect();
        while let Some(child) = stack.pop() {
            if self.is_filtered(tree, child) {
                stack.extend(self.active_children(tree, child).iter().rev());
            } else {
                visible.push(child);
            }
        }
        visible
    }

    fn visible_child_ids(&self, tree: &dyn HostTree, node: NodeRef) -> Vec<StableId> {
        self.visible_children(tree, node)
            .into_iter()
            .filter_map(|child| {
                let id = self.registry.get(tree, child);
                if id.is_none() {
                    warn!(%child, "visible child has no id");
                }
                id
            })
            .collect()
    }
}

/// The single-element slice at `index`, or empty.
fn branch_at(children: &[NodeRef], index: usize) -> &[NodeRef] {
    children
        .get(index)
        .map(std::slice::from_ref)
        .unwrap_or(&[])
}
