//! Several providers share one session and one bridge.

use super::support::Harness;
use serde_json::json;
use treeglass::bridge::{events, Envelope};
use treeglass::host::NodeKind;
use treeglass::provider::ProviderRegistration;
use treeglass::session::{MemoryPreferences, SessionOptions};
use treeglass::walker::Capabilities;

fn mount_app(h: &mut Harness, source: u32, child: &str) {
    h.attach(source);
    let arena = h.arena(source);
    let root = arena.create_root();
    let app = arena.create_child(root, NodeKind::Function, Some("App"));
    arena.create_child(app, NodeKind::Function, Some(child));
    h.commit(source, root);
}

#[test]
fn sources_have_independent_mirrors() {
    let mut h = Harness::new();
    mount_app(&mut h, 1, "Left");
    mount_app(&mut h, 2, "Right");

    let mirror = h.mirror();
    assert_eq!(mirror.source_ids(), vec![1, 2]);
    assert_eq!(mirror.len(1), 3);
    assert_eq!(mirror.len(2), 3);
    let right = mirror.walk(2)[2].1;
    assert_eq!(right.display_name.as_deref(), Some("Right"));
    assert_eq!(right.id.get(), 3);
}

#[test]
fn unknown_node_command_leaves_other_source_alone() {
    let mut h = Harness::new();
    mount_app(&mut h, 1, "Left");
    mount_app(&mut h, 2, "Right");
    let s1_ids = h.session.walker(1).unwrap().registry().len();
    let sent_before = h.transport.envelopes().len();

    let envelope = Envelope::new(
        "inspectNode",
        vec![json!({ "sourceId": 2, "nodeId": 999 })],
    );
    h.session.receive(envelope, &mut h.backend).unwrap();
    let envelope = Envelope::new(
        "overrideValue",
        vec![json!({ "sourceId": 2, "nodeId": 999, "path": ["state"], "value": 1 })],
    );
    h.session.receive(envelope, &mut h.backend).unwrap();
    h.advance(100);

    assert_eq!(h.session.walker(1).unwrap().registry().len(), s1_ids);
    let replies = h.transport.events(events::INSPECTED_NODE);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].payload[0]["type"], "not-found");
    assert!(h.transport.envelopes().len() > sent_before);
}

#[test]
fn unsupported_schema_is_announced_and_ignored() {
    let mut h = Harness::new();
    h.session
        .on_provider_attached(ProviderRegistration {
            source_id: 7,
            schema_version: 99,
            capabilities: Capabilities::default(),
        })
        .unwrap();
    h.advance(100);
    assert_eq!(h.transport.events(events::UNSUPPORTED_PROVIDER).len(), 1);
    assert!(h.session.walker(7).is_none());
    assert!(h.payloads().is_empty());
}

#[test]
fn detached_provider_stops_receiving_commands() {
    let mut h = Harness::new();
    mount_app(&mut h, 1, "Left");
    h.session.on_provider_detached(1);
    h.advance(100);
    assert_eq!(h.transport.events(events::PROVIDER_DETACHED).len(), 1);
    assert!(h.session.source_ids().is_empty());

    let envelope = Envelope::new("startProfiling", vec![json!({ "sourceId": 1 })]);
    h.session.receive(envelope, &mut h.backend).unwrap();
}

#[test]
fn selection_survives_reload() {
    let preferences = MemoryPreferences::new();
    let mut first = Harness::with_options(SessionOptions::default(), preferences.clone());
    mount_app(&mut first, 1, "Target");
    let envelope = Envelope::new("selectNode", vec![json!({ "sourceId": 1, "nodeId": 3 })]);
    first.session.receive(envelope, &mut first.backend).unwrap();

    let mut second = Harness::with_options(SessionOptions::default(), preferences);
    second.attach(1);
    let arena = second.arena(1);
    let root = arena.create_root();
    let app = arena.create_child(root, NodeKind::Function, Some("App"));
    arena.create_child(app, NodeKind::Function, Some("Other"));
    arena.create_child(app, NodeKind::Function, Some("Target"));
    second.commit(1, root);
    second.advance(100);

    let selected = second.transport.events(events::SELECT_NODE);
    assert_eq!(selected.len(), 1);
    // Target moved to index 1 but still matches by name and key.
    assert_eq!(selected[0].payload[0]["isFullMatch"], true);
    assert_eq!(selected[0].payload[0]["id"], 4);
}
