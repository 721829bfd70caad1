//! Streams produced across many commits keep a remote mirror consistent.

use super::support::Harness;
use treeglass::host::NodeKind;
use treeglass::mirror::MirrorTree;
use treeglass::types::SourceId;
use treeglass::walker::ConsoleLevel;

fn names(mirror: &MirrorTree, source: SourceId) -> Vec<String> {
    mirror
        .walk(source)
        .into_iter()
        .map(|(depth, node)| {
            format!(
                "{}{}",
                depth,
                node.display_name.as_deref().or(node.key.as_deref()).unwrap_or("root")
            )
        })
        .collect()
}

#[test]
fn mount_reorder_remove_and_unmount_root() {
    let mut h = Harness::new();
    h.attach(1);
    let arena = h.arena(1);
    let root = arena.create_root();
    let app = arena.create_child(root, NodeKind::Function, Some("App"));
    let list = arena.create_child(app, NodeKind::Function, Some("List"));
    let a = arena.create_child(list, NodeKind::Function, Some("A"));
    let b = arena.create_child(list, NodeKind::Function, Some("B"));
    arena.set_key(a, Some("a"));
    arena.set_key(b, Some("b"));
    let div = arena.create_child(app, NodeKind::Host, Some("div"));
    arena.create_child(div, NodeKind::Function, Some("Label"));
    h.commit(1, root);

    assert_eq!(
        names(&h.mirror(), 1),
        vec!["0root", "1App", "2List", "3A", "3B", "2Label"]
    );

    // Swap A and B.
    let arena = h.arena(1);
    let chain = arena.work_on_path(root, &[0, 0]).unwrap();
    arena.set_children(chain[2], vec![b, a]);
    arena.commit_root(chain[0]);
    let root = chain[0];
    h.commit(1, root);
    assert_eq!(
        names(&h.mirror(), 1),
        vec!["0root", "1App", "2List", "3B", "3A", "2Label"]
    );

    // Drop the list.
    let arena = h.arena(1);
    let list_current = chain[2];
    let chain = arena.work_on_path(root, &[0]).unwrap();
    arena.set_children(chain[1], vec![div]);
    arena.commit_root(chain[0]);
    let root = chain[0];
    h.unmount(1, list_current);
    h.commit(1, root);
    assert_eq!(names(&h.mirror(), 1), vec!["0root", "1App", "2Label"]);

    // Empty the root container.
    let arena = h.arena(1);
    let wip = arena.work_on(root);
    arena.set_children(wip, Vec::new());
    arena.commit_root(wip);
    h.commit(1, wip);
    let mirror = h.mirror();
    assert!(mirror.roots(1).is_empty());
    assert_eq!(mirror.len(1), 0);
}

#[test]
fn suspense_toggle_keeps_mirror_consistent() {
    let mut h = Harness::new();
    h.attach(1);
    let arena = h.arena(1);
    let root = arena.create_root();
    let suspense = arena.create_child(root, NodeKind::Suspense, Some("Suspense"));
    let content = arena.create_child(suspense, NodeKind::Function, Some("Content"));
    arena.create_child(content, NodeKind::Function, Some("Row"));
    arena.create_child(suspense, NodeKind::Function, Some("Spinner"));
    h.commit(1, root);
    assert_eq!(
        names(&h.mirror(), 1),
        vec!["0root", "1Suspense", "2Content", "3Row"]
    );

    let arena = h.arena(1);
    let chain = arena.work_on_path(root, &[0]).unwrap();
    arena.set_shows_fallback(chain[1], true);
    arena.commit_root(chain[0]);
    let root = chain[0];
    h.commit(1, root);
    assert_eq!(names(&h.mirror(), 1), vec!["0root", "1Suspense", "2Spinner"]);

    let arena = h.arena(1);
    let chain = arena.work_on_path(root, &[0]).unwrap();
    arena.set_shows_fallback(chain[1], false);
    arena.commit_root(chain[0]);
    h.commit(1, chain[0]);
    assert_eq!(
        names(&h.mirror(), 1),
        vec!["0root", "1Suspense", "2Content", "3Row"]
    );
}

#[test]
fn console_counts_reach_the_mirror_after_the_delay() {
    let mut h = Harness::new();
    h.attach(1);
    let arena = h.arena(1);
    let root = arena.create_root();
    let app = arena.create_child(root, NodeKind::Function, Some("App"));
    h.commit(1, root);

    let tree = h.backend.arena(1).unwrap();
    h.session.on_console_message(1, tree, app, ConsoleLevel::Error);
    let tree = h.backend.arena(1).unwrap();
    h.session.on_console_message(1, tree, app, ConsoleLevel::Warning);
    let tree = h.backend.arena(1).unwrap();
    h.session.on_console_message(1, tree, app, ConsoleLevel::Warning);
    h.drain();
    let before = h.mirror();
    let app_node = before.walk(1)[1].1.clone();
    assert_eq!((app_node.errors, app_node.warnings), (0, 0));

    h.advance(1000);
    let after = h.mirror();
    let app_node = after.walk(1)[1].1;
    assert_eq!((app_node.errors, app_node.warnings), (1, 2));
}

#[test]
fn second_root_unmounts_without_touching_the_first() {
    let mut h = Harness::new();
    h.attach(1);
    let arena = h.arena(1);
    let first = arena.create_root();
    arena.create_child(first, NodeKind::Function, Some("Main"));
    let second = arena.create_root();
    arena.create_child(second, NodeKind::Function, Some("Portal"));
    h.commit(1, first);
    h.commit(1, second);
    assert_eq!(h.mirror().roots(1).len(), 2);

    h.arena(1).remove_root(second);
    h.unmount(1, second);
    let arena = h.arena(1);
    let wip = arena.work_on(first);
    arena.create_child(wip, NodeKind::Function, Some("Toast"));
    arena.commit_root(wip);
    h.commit(1, wip);

    let mirror = h.mirror();
    assert_eq!(mirror.roots(1).len(), 1);
    assert_eq!(names(&mirror, 1), vec!["0root", "1Main", "1Toast"]);
}
