//! Shared harness: one session over an in-memory transport and arenas.

use std::sync::Arc;
use treeglass::bridge::{events, Envelope, MemoryTransport};
use treeglass::clock::{Clock, ManualClock};
use treeglass::host::{ArenaBackend, HostArena};
use treeglass::mirror::MirrorTree;
use treeglass::provider::ProviderRegistration;
use treeglass::session::{MemoryPreferences, Session, SessionOptions};
use treeglass::types::{NodeRef, SourceId};
use treeglass::walker::Capabilities;

pub struct Harness {
    pub session: Session,
    pub transport: MemoryTransport,
    pub clock: ManualClock,
    pub backend: ArenaBackend,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(SessionOptions::default(), MemoryPreferences::new())
    }

    pub fn with_options(options: SessionOptions, preferences: MemoryPreferences) -> Self {
        let transport = MemoryTransport::new();
        let clock = ManualClock::new(0);
        let mut session = Session::new(
            transport.clone(),
            Arc::new(clock.clone()),
            preferences,
            options,
        );
        session.connect(2).unwrap();
        Self {
            session,
            transport,
            clock,
            backend: ArenaBackend::new(),
        }
    }

    /// Attach `source` on schema 3 with an empty arena.
    pub fn attach(&mut self, source: SourceId) {
        self.attach_with(source, Capabilities::default());
    }

    pub fn attach_with(&mut self, source: SourceId, capabilities: Capabilities) {
        self.session
            .on_provider_attached(ProviderRegistration {
                source_id: source,
                schema_version: 3,
                capabilities,
            })
            .unwrap();
        self.backend.insert(source, HostArena::new(3).unwrap());
    }

    pub fn arena(&mut self, source: SourceId) -> &mut HostArena {
        self.backend.arena_mut(source).unwrap()
    }

    pub fn commit(&mut self, source: SourceId, root: NodeRef) {
        let tree = self.backend.arena(source).unwrap();
        self.session.on_commit_end(source, tree, root).unwrap();
        self.drain();
    }

    pub fn unmount(&mut self, source: SourceId, node: NodeRef) {
        let tree = self.backend.arena(source).unwrap();
        self.session.on_node_unmounted(source, tree, node);
    }

    /// Run due timers and push whatever is queued out of the bridge.
    pub fn drain(&mut self) {
        let now = self.clock.now_ms();
        self.session.tick(now);
        self.session.bridge_mut().flush_now(now);
    }

    pub fn advance(&mut self, ms: u64) {
        self.clock.advance(ms);
        self.drain();
    }

    pub fn payloads(&self) -> Vec<Vec<u32>> {
        self.transport
            .events(events::OPERATIONS)
            .iter()
            .filter_map(Envelope::operations_payload)
            .collect()
    }

    /// Replay everything sent so far into a fresh mirror.
    pub fn mirror(&self) -> MirrorTree {
        let mut mirror = MirrorTree::new();
        for payload in self.payloads() {
            mirror.apply(&payload).unwrap();
        }
        mirror
    }
}
