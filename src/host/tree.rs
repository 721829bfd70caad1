//! Read-only view of a host-owned, double-buffered component tree.

use crate::types::{NodeRef, SourceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Render timings reported by a host that supports profiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDurations {
    /// Time spent rendering this node and its descendants in the last commit.
    pub actual_ms: f64,
    /// Time spent rendering this node alone in the last commit.
    pub self_ms: f64,
    /// Estimated cost of re-rendering the whole subtree.
    pub tree_base_ms: f64,
    /// Whether the node rendered in the last commit.
    pub did_render: bool,
}

/// One step into a nested inspected value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// Borrowed view of one provider's tree.
///
/// Nodes are arena indices. `alternate` links a node to its shadow copy; the
/// pair always denotes one logical node. Accessors for optional metadata have
/// defaults so minimal hosts only implement structure.
pub trait HostTree {
    /// Host-specific kind tag, translated through the provider's kind table.
    fn kind(&self, node: NodeRef) -> u32;

    fn alternate(&self, node: NodeRef) -> Option<NodeRef>;

    fn children(&self, node: NodeRef) -> &[NodeRef];

    fn parent(&self, node: NodeRef) -> Option<NodeRef>;

    /// Current root nodes, one per mounted container.
    fn roots(&self) -> Vec<NodeRef>;

    fn key(&self, _node: NodeRef) -> Option<&str> {
        None
    }

    fn display_name(&self, _node: NodeRef) -> Option<&str> {
        None
    }

    fn source_location(&self, _node: NodeRef) -> Option<&str> {
        None
    }

    /// The node that rendered this one, if the host tracks owners.
    fn owner(&self, _node: NodeRef) -> Option<NodeRef> {
        None
    }

    /// For collapsible nodes: true while the fallback branch is active.
    fn shows_fallback(&self, _node: NodeRef) -> bool {
        false
    }

    /// Whether a root node currently holds rendered content.
    fn root_has_content(&self, root: NodeRef) -> bool {
        !self.children(root).is_empty()
    }

    fn durations(&self, _node: NodeRef) -> Option<NodeDurations> {
        None
    }

    /// Mode bits in effect for the subtree rooted at this node.
    fn subtree_mode(&self, _node: NodeRef) -> u32 {
        0
    }

    /// Snapshot of the node's inspectable data.
    fn inspect(&self, _node: NodeRef) -> Option<Value> {
        None
    }
}

/// What the host integration lends to the session router for commands.
pub trait HostBackend {
    fn tree(&self, source: SourceId) -> Option<&dyn HostTree>;

    /// Apply an inspector-requested value override. Returns false if the host
    /// refused or the node is gone.
    fn override_value(
        &mut self,
        source: SourceId,
        node: NodeRef,
        path: &[PathSegment],
        value: Value,
    ) -> bool;
}

/// Walk `path` into `value`.
pub fn value_at<'a>(value: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| match segment {
        PathSegment::Key(key) => current.get(key.as_str()),
        PathSegment::Index(index) => match current {
            Value::Array(items) => items.get(*index),
            Value::Object(map) => map.get(&index.to_string()),
            _ => None,
        },
    })
}

/// Replace the value at `path` inside `root`, creating object keys as needed.
pub fn set_value_at(root: &mut Value, path: &[PathSegment], value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return true;
    };
    let mut current = root;
    for segment in parents {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Default::default())),
            (PathSegment::Index(index), Value::Array(items)) => match items.get_mut(*index) {
                Some(next) => next,
                None => return false,
            },
            _ => return false,
        };
    }
    match (last, current) {
        (PathSegment::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
            true
        }
        (PathSegment::Index(index), Value::Array(items)) if *index < items.len() => {
            items[*index] = value;
            true
        }
        _ => false,
    }
}
