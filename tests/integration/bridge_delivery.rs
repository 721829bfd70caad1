//! Delivery through the bridge: batching, failure retention, shutdown.

use super::support::Harness;
use std::sync::Arc;
use treeglass::bridge::{events, Bridge, ChannelTransport, Envelope, MemoryTransport};
use treeglass::clock::ManualClock;
use treeglass::host::{ArenaBackend, HostArena, NodeKind};
use treeglass::mirror::MirrorTree;
use treeglass::provider::ProviderRegistration;
use treeglass::session::{MemoryPreferences, Session, SessionOptions};
use treeglass::walker::Capabilities;

#[test]
fn failed_batch_is_retried_in_order() {
    let mut h = Harness::new();
    h.attach(1);
    h.transport.set_failing(true);
    let arena = h.arena(1);
    let root = arena.create_root();
    arena.create_child(root, NodeKind::Function, Some("App"));
    h.commit(1, root);
    assert!(h.payloads().is_empty());
    assert!(h.session.bridge().pending() > 0);

    h.transport.set_failing(false);
    h.drain();
    let mirror = h.mirror();
    assert_eq!(mirror.len(1), 2);
    // The protocol reply queued first is still delivered first.
    let first = &h.transport.envelopes()[0];
    assert_eq!(first.event, events::BRIDGE_PROTOCOL);
}

#[test]
fn operations_wait_for_negotiation() {
    let clock = ManualClock::new(0);
    let (transport, receiver) = ChannelTransport::new_pair();
    let mut bridge = Bridge::new(transport, Arc::new(clock.clone()), 100);
    bridge.send_operations(&[1, 1, 0]);
    bridge.tick(0);
    assert!(receiver.try_recv().is_err());

    bridge.negotiate(2).unwrap();
    bridge.tick(0);
    let batch = receiver.try_recv().unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].operations_payload(), Some(vec![1, 1, 0]));
}

#[test]
fn session_shutdown_drains_everything_once() {
    let mut h = Harness::new();
    h.attach(1);
    h.attach(2);
    h.drain();
    for source in [1, 2] {
        let arena = h.arena(source);
        let root = arena.create_root();
        arena.create_child(root, NodeKind::Function, Some("App"));
        let tree = h.backend.arena(source).unwrap();
        h.session.on_commit_end(source, tree, root).unwrap();
    }
    assert!(h.session.bridge().pending() >= 2);
    let before = h.transport.batches().len();

    h.session.shutdown();
    assert!(h.session.is_shut_down());
    let batches = h.transport.batches();
    assert_eq!(batches.len(), before + 1);
    let last = batches.last().unwrap();
    assert_eq!(last.last().unwrap().event, events::SHUTDOWN);
    assert_eq!(h.payloads().len(), 2);

    h.session.bridge_mut().send("late", Vec::new());
    h.advance(1000);
    assert_eq!(h.transport.batches().len(), before + 1);
}

#[test]
fn rejected_inspector_does_not_accumulate_commits() {
    let transport = MemoryTransport::new();
    let clock = ManualClock::new(0);
    let mut session = Session::new(
        transport.clone(),
        Arc::new(clock.clone()),
        MemoryPreferences::new(),
        SessionOptions::default(),
    );
    session
        .on_provider_attached(ProviderRegistration {
            source_id: 1,
            schema_version: 3,
            capabilities: Capabilities::default(),
        })
        .unwrap();
    let mut backend = ArenaBackend::new();
    backend.insert(1, HostArena::new(3).unwrap());
    assert!(session.connect(0).is_err());

    let arena = backend.arena_mut(1).unwrap();
    let mut current = arena.create_root();
    arena.create_child(current, NodeKind::Function, Some("App"));
    session
        .on_commit_end(1, backend.arena(1).unwrap(), current)
        .unwrap();
    for _ in 0..5 {
        let arena = backend.arena_mut(1).unwrap();
        let wip = arena.work_on(current);
        arena.create_child(wip, NodeKind::Function, Some("Item"));
        arena.commit_root(wip);
        session.on_commit_end(1, backend.arena(1).unwrap(), wip).unwrap();
        current = wip;
        assert_eq!(session.bridge().held(), 0);
    }
    session.tick(0);
    session.bridge_mut().flush_now(0);
    assert!(transport.events(events::OPERATIONS).is_empty());

    session.connect(2).unwrap();
    session.remount(&backend).unwrap();
    session.bridge_mut().flush_now(0);
    let payloads: Vec<Vec<u32>> = transport
        .events(events::OPERATIONS)
        .iter()
        .filter_map(Envelope::operations_payload)
        .collect();
    assert_eq!(payloads.len(), 1);
    let mut mirror = MirrorTree::new();
    mirror.apply(&payloads[0]).unwrap();
    assert_eq!(mirror.len(1), 7);
}
