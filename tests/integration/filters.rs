//! Filter changes retract and remount every root without breaking the mirror.

use super::support::Harness;
use serde_json::json;
use treeglass::bridge::Envelope;
use treeglass::host::NodeKind;

fn set_filters(h: &mut Harness, filters: serde_json::Value) {
    let envelope = Envelope::new(
        "setFilters",
        vec![json!({ "sourceId": 1, "filters": filters })],
    );
    h.session.receive(envelope, &mut h.backend).unwrap();
    h.drain();
}

fn display_names(h: &Harness) -> Vec<Option<String>> {
    h.mirror()
        .walk(1)
        .into_iter()
        .map(|(_, node)| node.display_name.clone())
        .collect()
}

#[test]
fn clearing_filters_reveals_host_nodes() {
    let mut h = Harness::new();
    h.attach(1);
    let arena = h.arena(1);
    let root = arena.create_root();
    let app = arena.create_child(root, NodeKind::Function, Some("App"));
    let div = arena.create_child(app, NodeKind::Host, Some("div"));
    arena.create_child(div, NodeKind::Function, Some("Label"));
    h.commit(1, root);
    assert_eq!(
        display_names(&h),
        vec![None, Some("App".into()), Some("Label".into())]
    );

    set_filters(&mut h, json!([]));
    assert_eq!(
        display_names(&h),
        vec![
            None,
            Some("App".into()),
            Some("div".into()),
            Some("Label".into())
        ]
    );
    // Ids survive the retraction.
    let mirror = h.mirror();
    assert_eq!(mirror.walk(1)[1].1.id.get(), 2);
}

#[test]
fn name_filter_hides_matching_components() {
    let mut h = Harness::new();
    h.attach(1);
    let arena = h.arena(1);
    let root = arena.create_root();
    let app = arena.create_child(root, NodeKind::Function, Some("App"));
    let internal = arena.create_child(app, NodeKind::Function, Some("InternalProvider"));
    arena.create_child(internal, NodeKind::Function, Some("Page"));
    h.commit(1, root);

    set_filters(
        &mut h,
        json!([
            { "type": "element_type", "value": "host" },
            { "type": "display_name", "value": "^Internal" }
        ]),
    );
    assert_eq!(
        display_names(&h),
        vec![None, Some("App".into()), Some("Page".into())]
    );

    // Later commits honour the new filters.
    let arena = h.arena(1);
    let chain = arena.work_on_path(root, &[0, 0]).unwrap();
    arena.create_child(chain[2], NodeKind::Function, Some("Footer"));
    arena.commit_root(chain[0]);
    h.commit(1, chain[0]);
    assert_eq!(
        display_names(&h),
        vec![
            None,
            Some("App".into()),
            Some("Page".into()),
            Some("Footer".into())
        ]
    );
}

#[test]
fn hoc_filter_hides_wrappers() {
    let mut h = Harness::new();
    h.attach(1);
    let arena = h.arena(1);
    let root = arena.create_root();
    let wrapper = arena.create_child(root, NodeKind::Function, Some("withRouter(Page)"));
    arena.create_child(wrapper, NodeKind::Function, Some("Page"));
    h.commit(1, root);

    set_filters(&mut h, json!([{ "type": "hoc" }]));
    assert_eq!(display_names(&h), vec![None, Some("Page".into())]);
}
