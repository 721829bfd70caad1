//! Random trees and random edits: the mirror rebuilt from the stream always
//! equals the visible tree.

use proptest::prelude::*;
use std::sync::Arc;
use treeglass::bridge::{events, Envelope, MemoryTransport};
use treeglass::clock::{Clock, ManualClock};
use treeglass::host::{ArenaBackend, HostArena, HostTree, NodeKind};
use treeglass::mirror::MirrorTree;
use treeglass::provider::ProviderRegistration;
use treeglass::session::{MemoryPreferences, Session, SessionOptions};
use treeglass::types::NodeRef;
use treeglass::walker::Capabilities;

#[derive(Debug, Clone)]
enum Edit {
    Append { path: Vec<u8>, host: bool },
    Rotate { path: Vec<u8>, by: u8 },
    Remove { path: Vec<u8>, index: u8 },
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    let path = prop::collection::vec(any::<u8>(), 0..4);
    prop_oneof![
        (path.clone(), any::<bool>()).prop_map(|(path, host)| Edit::Append { path, host }),
        (path.clone(), 1u8..4).prop_map(|(path, by)| Edit::Rotate { path, by }),
        (path, any::<u8>()).prop_map(|(path, index)| Edit::Remove { path, index }),
    ]
}

/// Child indices from `root`, following `seeds` while children exist.
fn resolve(arena: &HostArena, root: NodeRef, seeds: &[u8]) -> Vec<usize> {
    let mut indices = Vec::new();
    let mut node = root;
    for seed in seeds {
        let children = arena.children(node);
        if children.is_empty() {
            break;
        }
        let index = *seed as usize % children.len();
        indices.push(index);
        node = children[index];
    }
    indices
}

fn name(counter: &mut usize, host: bool) -> String {
    *counter += 1;
    if host {
        format!("host{}", counter)
    } else {
        format!("Comp{}", counter)
    }
}

fn expected(arena: &HostArena, root: NodeRef) -> Vec<(usize, String)> {
    fn visit(arena: &HostArena, node: NodeRef, depth: usize, out: &mut Vec<(usize, String)>) {
        for &child in arena.children(node) {
            let name = arena.display_name(child).unwrap_or_default();
            if name.starts_with("host") {
                visit(arena, child, depth, out);
            } else {
                out.push((depth, name.to_string()));
                visit(arena, child, depth + 1, out);
            }
        }
    }
    let mut out = Vec::new();
    if !arena.children(root).is_empty() {
        out.push((0, "root".to_string()));
        visit(arena, root, 1, &mut out);
    }
    out
}

fn mirrored(transport: &MemoryTransport) -> Result<Vec<(usize, String)>, TestCaseError> {
    let mut mirror = MirrorTree::new();
    for envelope in transport.events(events::OPERATIONS) {
        let payload = Envelope::operations_payload(&envelope)
            .ok_or_else(|| TestCaseError::fail("operations envelope without payload"))?;
        mirror
            .apply(&payload)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
    }
    Ok(mirror
        .walk(1)
        .into_iter()
        .map(|(depth, node)| {
            (
                depth,
                node.display_name.clone().unwrap_or_else(|| "root".to_string()),
            )
        })
        .collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn mirror_tracks_visible_tree(
        shape in prop::collection::vec((any::<u8>(), any::<bool>()), 1..12),
        edits in prop::collection::vec(edit_strategy(), 0..12),
    ) {
        let transport = MemoryTransport::new();
        let clock = ManualClock::new(0);
        let mut session = Session::new(
            transport.clone(),
            Arc::new(clock.clone()),
            MemoryPreferences::new(),
            SessionOptions::default(),
        );
        session.connect(2).unwrap();
        session
            .on_provider_attached(ProviderRegistration {
                source_id: 1,
                schema_version: 3,
                capabilities: Capabilities::default(),
            })
            .unwrap();

        let mut counter = 0;
        let mut arena = HostArena::new(3).unwrap();
        let mut root = arena.create_root();
        let mut nodes = vec![root];
        for (seed, host) in &shape {
            let parent = nodes[*seed as usize % nodes.len()];
            let kind = if *host { NodeKind::Host } else { NodeKind::Function };
            let label = name(&mut counter, *host);
            nodes.push(arena.create_child(parent, kind, Some(&label)));
        }
        let mut backend = ArenaBackend::new();
        backend.insert(1, arena);

        let commit = |session: &mut Session, backend: &ArenaBackend, root: NodeRef| {
            let tree = backend.arena(1).unwrap();
            session.on_commit_end(1, tree, root).unwrap();
            let now = clock.now_ms();
            session.tick(now);
            session.bridge_mut().flush_now(now);
            clock.advance(10);
        };

        commit(&mut session, &backend, root);
        prop_assert_eq!(mirrored(&transport)?, expected(backend.arena(1).unwrap(), root));

        for edit in &edits {
            let arena = backend.arena_mut(1).unwrap();
            let (seeds, host) = match edit {
                Edit::Append { path, host } => (path, *host),
                Edit::Rotate { path, .. } | Edit::Remove { path, .. } => (path, false),
            };
            let indices = resolve(arena, root, seeds);
            let chain = arena.work_on_path(root, &indices).unwrap();
            let target = *chain.last().unwrap();
            let mut removed = None;
            match edit {
                Edit::Append { .. } => {
                    let kind = if host { NodeKind::Host } else { NodeKind::Function };
                    let label = name(&mut counter, host);
                    arena.create_child(target, kind, Some(&label));
                }
                Edit::Rotate { by, .. } => {
                    let mut children = arena.children(target).to_vec();
                    if !children.is_empty() {
                        let by = *by as usize % children.len();
                        children.rotate_left(by);
                        arena.set_children(target, children);
                    }
                }
                Edit::Remove { index, .. } => {
                    let mut children = arena.children(target).to_vec();
                    if !children.is_empty() {
                        let gone = children.remove(*index as usize % children.len());
                        arena.set_children(target, children);
                        removed = Some(gone);
                    }
                }
            }
            arena.commit_root(chain[0]);
            root = chain[0];

            if let Some(gone) = removed {
                let tree = backend.arena(1).unwrap();
                session.on_node_unmounted(1, tree, gone);
            }
            commit(&mut session, &backend, root);
            prop_assert_eq!(mirrored(&transport)?, expected(backend.arena(1).unwrap(), root));
        }
    }
}
