//! Arena-backed host tree
//!
//! A double-buffered tree where every node lives in one `Vec` and is
//! addressed by [`NodeRef`]. Updating a node never mutates it in place:
//! [`HostArena::work_on`] produces the node's alternate carrying the next
//! version, reusing the previous alternate slot when one exists.

use crate::host::kinds::{KindTable, NodeKind};
use crate::host::tree::{set_value_at, HostBackend, HostTree, NodeDurations, PathSegment};
use crate::types::{NodeRef, SourceId};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct ArenaNode {
    pub tag: u32,
    pub display_name: Option<String>,
    pub key: Option<String>,
    pub source_location: Option<String>,
    pub children: Vec<NodeRef>,
    pub parent: Option<NodeRef>,
    pub alternate: Option<NodeRef>,
    pub owner: Option<NodeRef>,
    pub shows_fallback: bool,
    pub durations: Option<NodeDurations>,
    pub mode: u32,
    pub data: Option<Value>,
}

/// Host tree stored as an arena of nodes.
#[derive(Debug, Clone)]
pub struct HostArena {
    kinds: KindTable,
    nodes: Vec<ArenaNode>,
    roots: Vec<NodeRef>,
}

impl HostArena {
    /// Create an empty arena using the kind numbering of `schema_version`.
    pub fn new(schema_version: u32) -> Option<Self> {
        KindTable::for_schema(schema_version).map(|kinds| Self {
            kinds,
            nodes: Vec::new(),
            roots: Vec::new(),
        })
    }

    pub fn schema_version(&self) -> u32 {
        self.kinds.schema_version()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, node: NodeRef) -> &ArenaNode {
        &self.nodes[node.index()]
    }

    pub fn node_mut(&mut self, node: NodeRef) -> &mut ArenaNode {
        &mut self.nodes[node.index()]
    }

    /// Allocate a detached node of `kind`.
    ///
    /// Kinds the schema cannot express are stored with an out-of-table tag
    /// and read back as [`NodeKind::Unknown`].
    pub fn create(&mut self, kind: NodeKind, display_name: Option<&str>) -> NodeRef {
        let tag = self.kinds.tag_for(kind).unwrap_or(u32::MAX);
        let node = NodeRef(self.nodes.len() as u32);
        self.nodes.push(ArenaNode {
            tag,
            display_name: display_name.map(str::to_string),
            ..ArenaNode::default()
        });
        node
    }

    /// Allocate a new empty root container and register it.
    pub fn create_root(&mut self) -> NodeRef {
        let root = self.create(NodeKind::Root, None);
        self.roots.push(root);
        root
    }

    /// Allocate a node of `kind` and append it under `parent`.
    pub fn create_child(
        &mut self,
        parent: NodeRef,
        kind: NodeKind,
        display_name: Option<&str>,
    ) -> NodeRef {
        let child = self.create(kind, display_name);
        self.append_child(parent, child);
        child
    }

    pub fn append_child(&mut self, parent: NodeRef, child: NodeRef) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    pub fn set_children(&mut self, parent: NodeRef, children: Vec<NodeRef>) {
        for child in &children {
            self.nodes[child.index()].parent = Some(parent);
        }
        self.nodes[parent.index()].children = children;
    }

    pub fn set_key(&mut self, node: NodeRef, key: Option<&str>) {
        self.nodes[node.index()].key = key.map(str::to_string);
    }

    pub fn set_source_location(&mut self, node: NodeRef, location: Option<&str>) {
        self.nodes[node.index()].source_location = location.map(str::to_string);
    }

    pub fn set_owner(&mut self, node: NodeRef, owner: Option<NodeRef>) {
        self.nodes[node.index()].owner = owner;
    }

    pub fn set_shows_fallback(&mut self, node: NodeRef, shows_fallback: bool) {
        self.nodes[node.index()].shows_fallback = shows_fallback;
    }

    pub fn set_durations(&mut self, node: NodeRef, durations: Option<NodeDurations>) {
        self.nodes[node.index()].durations = durations;
    }

    pub fn set_mode(&mut self, node: NodeRef, mode: u32) {
        self.nodes[node.index()].mode = mode;
    }

    pub fn set_data(&mut self, node: NodeRef, data: Option<Value>) {
        self.nodes[node.index()].data = data;
    }

    /// Produce the work-in-progress version of `node`.
    ///
    /// The returned node is `node`'s alternate and starts as a copy of it,
    /// sharing the same child indices until those children are worked on.
    pub fn work_on(&mut self, node: NodeRef) -> NodeRef {
        let mut next = self.nodes[node.index()].clone();
        next.alternate = Some(node);
        match self.nodes[node.index()].alternate {
            Some(existing) => {
                self.nodes[existing.index()] = next;
                existing
            }
            None => {
                let created = NodeRef(self.nodes.len() as u32);
                self.nodes.push(next);
                self.nodes[node.index()].alternate = Some(created);
                created
            }
        }
    }

    /// Work on the child at `index` of `parent_wip` and splice it in.
    pub fn work_on_child(&mut self, parent_wip: NodeRef, index: usize) -> Option<NodeRef> {
        let current = *self.nodes[parent_wip.index()].children.get(index)?;
        let next = self.work_on(current);
        self.nodes[parent_wip.index()].children[index] = next;
        self.nodes[next.index()].parent = Some(parent_wip);
        Some(next)
    }

    /// Work on each node along `path` (child indices) starting at `root`.
    ///
    /// Returns the work-in-progress nodes, root first.
    pub fn work_on_path(&mut self, root: NodeRef, path: &[usize]) -> Option<Vec<NodeRef>> {
        let mut chain = vec![self.work_on(root)];
        for &index in path {
            let parent = *chain.last()?;
            chain.push(self.work_on_child(parent, index)?);
        }
        Some(chain)
    }

    /// Swap the committed root: `wip` replaces its alternate as current.
    pub fn commit_root(&mut self, wip: NodeRef) {
        let previous = self.nodes[wip.index()].alternate;
        match self
            .roots
            .iter_mut()
            .find(|root| Some(**root) == previous || **root == wip)
        {
            Some(slot) => *slot = wip,
            None => self.roots.push(wip),
        }
    }

    /// Drop a root container (and its alternate) from the root list.
    pub fn remove_root(&mut self, root: NodeRef) {
        let alternate = self.nodes[root.index()].alternate;
        self.roots
            .retain(|current| *current != root && Some(*current) != alternate);
    }

    /// Apply an override to a node's inspectable data.
    pub fn override_value(&mut self, node: NodeRef, path: &[PathSegment], value: Value) -> bool {
        let Some(entry) = self.nodes.get_mut(node.index()) else {
            return false;
        };
        let data = entry.data.get_or_insert_with(|| Value::Object(Default::default()));
        set_value_at(data, path, value)
    }
}

impl HostTree for HostArena {
    fn kind(&self, node: NodeRef) -> u32 {
        self.nodes[node.index()].tag
    }

    fn alternate(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes[node.index()].alternate
    }

    fn children(&self, node: NodeRef) -> &[NodeRef] {
        &self.nodes[node.index()].children
    }

    fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes[node.index()].parent
    }

    fn roots(&self) -> Vec<NodeRef> {
        self.roots.clone()
    }

    fn key(&self, node: NodeRef) -> Option<&str> {
        self.nodes[node.index()].key.as_deref()
    }

    fn display_name(&self, node: NodeRef) -> Option<&str> {
        self.nodes[node.index()].display_name.as_deref()
    }

    fn source_location(&self, node: NodeRef) -> Option<&str> {
        self.nodes[node.index()].source_location.as_deref()
    }

    fn owner(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes[node.index()].owner
    }

    fn shows_fallback(&self, node: NodeRef) -> bool {
        self.nodes[node.index()].shows_fallback
    }

    fn durations(&self, node: NodeRef) -> Option<NodeDurations> {
        self.nodes[node.index()].durations
    }

    fn subtree_mode(&self, node: NodeRef) -> u32 {
        self.nodes[node.index()].mode
    }

    fn inspect(&self, node: NodeRef) -> Option<Value> {
        self.nodes.get(node.index()).and_then(|n| n.data.clone())
    }
}

/// One arena per source: the simplest [`HostBackend`].
#[derive(Debug, Clone, Default)]
pub struct ArenaBackend {
    arenas: BTreeMap<SourceId, HostArena>,
}

impl ArenaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: SourceId, arena: HostArena) {
        self.arenas.insert(source, arena);
    }

    pub fn arena(&self, source: SourceId) -> Option<&HostArena> {
        self.arenas.get(&source)
    }

    pub fn arena_mut(&mut self, source: SourceId) -> Option<&mut HostArena> {
        self.arenas.get_mut(&source)
    }
}

impl HostBackend for ArenaBackend {
    fn tree(&self, source: SourceId) -> Option<&dyn HostTree> {
        self.arenas
            .get(&source)
            .map(|arena| arena as &dyn HostTree)
    }

    fn override_value(
        &mut self,
        source: SourceId,
        node: NodeRef,
        path: &[PathSegment],
        value: Value,
    ) -> bool {
        self.arenas
            .get_mut(&source)
            .map(|arena| arena.override_value(node, path, value))
            .unwrap_or(false)
    }
}
