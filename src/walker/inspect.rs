//! Node inspection.

use super::Walker;
use crate::host::{value_at, ElementType, HostTree, PathSegment};
use crate::types::{NodeRef, StableId};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerEntry {
    pub id: Option<StableId>,
    pub display_name: Option<String>,
}

/// Snapshot of one node, answered to `inspectNode`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectedNode {
    pub id: StableId,
    pub element_type: ElementType,
    pub display_name: Option<String>,
    pub key: Option<String>,
    pub source_location: Option<String>,
    pub owners: Vec<OwnerEntry>,
    pub errors: u32,
    pub warnings: u32,
    pub path: Vec<PathSegment>,
    pub value: Option<Value>,
}

impl Walker {
    /// Inspect `id`, reading the value at `path` from the host's data.
    ///
    /// `None` when the id no longer resolves to a live node.
    pub fn inspect(
        &self,
        tree: &dyn HostTree,
        id: StableId,
        path: &[PathSegment],
    ) -> Option<InspectedNode> {
        let node = self.node_for_id(tree, id)?;
        let (errors, warnings) = self.error_warning_counts(id);
        let value = tree
            .inspect(node)
            .and_then(|data| value_at(&data, path).cloned());
        Some(InspectedNode {
            id,
            element_type: self.kind_of(tree, node).element_type(),
            display_name: tree.display_name(node).map(str::to_string),
            key: tree.key(node).map(str::to_string),
            source_location: tree.source_location(node).map(str::to_string),
            owners: self.owner_chain(tree, node),
            errors,
            warnings,
            path: path.to_vec(),
            value,
        })
    }

    /// Owners nearest first. Stops on a cycle.
    fn owner_chain(&self, tree: &dyn HostTree, node: NodeRef) -> Vec<OwnerEntry> {
        let mut owners = Vec::new();
        let mut seen = HashSet::from([node]);
        let mut cursor = tree.owner(node);
        while let Some(owner) = cursor {
            if !seen.insert(owner) {
                break;
            }
            owners.push(OwnerEntry {
                id: self.registry.get(tree, owner),
                display_name: tree.display_name(owner).map(str::to_string),
            });
            cursor = tree.owner(owner);
        }
        owners
    }
}
