//! Session Router
//!
//! Multiplexes every attached provider over one bridge. The router holds no
//! tree data: host callbacks and inbound commands carry a source id and are
//! routed to that source's walker only. An unknown source is logged and
//! ignored so one misbehaving source never affects the others.

pub mod commands;
pub mod preferences;

pub use commands::Command;
pub use preferences::{MemoryPreferences, PreferenceStore};

use crate::bridge::{current_protocol, events, Bridge, Envelope, ProtocolEntry, Transport};
use crate::clock::Clock;
use crate::error::AgentError;
use crate::host::{HostBackend, HostTree};
use crate::provider::{Provider, ProviderRegistration};
use crate::ticker::earliest;
use crate::types::{NodeRef, SourceId};
use crate::walker::{default_filters, ComponentFilter, ConsoleLevel, PathFrame, Walker, WalkerOptions};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Session-wide settings applied to every provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub batch_duration_ms: u64,
    pub walker: WalkerOptions,
    pub filters: Vec<ComponentFilter>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            batch_duration_ms: crate::bridge::DEFAULT_BATCH_DURATION_MS,
            walker: WalkerOptions::default(),
            filters: default_filters(),
        }
    }
}

fn selection_key(source_id: SourceId) -> String {
    format!("selection:{source_id}")
}

pub struct Session {
    providers: BTreeMap<SourceId, Provider>,
    bridge: Bridge,
    clock: Arc<dyn Clock>,
    preferences: Box<dyn PreferenceStore>,
    options: SessionOptions,
    announced_unsupported: HashSet<SourceId>,
    pending_selection: HashMap<SourceId, Vec<PathFrame>>,
}

impl Session {
    pub fn new(
        transport: impl Transport + 'static,
        clock: Arc<dyn Clock>,
        preferences: impl PreferenceStore + 'static,
        options: SessionOptions,
    ) -> Self {
        let bridge = Bridge::new(transport, clock.clone(), options.batch_duration_ms);
        Self {
            providers: BTreeMap::new(),
            bridge,
            clock,
            preferences: Box::new(preferences),
            options,
            announced_unsupported: HashSet::new(),
            pending_selection: HashMap::new(),
        }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut Bridge {
        &mut self.bridge
    }

    pub fn provider(&self, source_id: SourceId) -> Option<&Provider> {
        self.providers.get(&source_id)
    }

    pub fn walker(&self, source_id: SourceId) -> Option<&Walker> {
        self.providers.get(&source_id).and_then(Provider::walker)
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        self.providers.keys().copied().collect()
    }

    /// Negotiate the bridge protocol with the inspector.
    ///
    /// If operations were dropped while no protocol was agreed, every walker
    /// forgets what the mirror holds; call [`Session::remount`] to resend
    /// the trees now, or they go out whole with each root's next commit.
    pub fn connect(&mut self, counterpart: u32) -> Result<ProtocolEntry, AgentError> {
        match self.bridge.negotiate(counterpart) {
            Ok(entry) => {
                self.bridge
                    .send(events::BRIDGE_PROTOCOL, vec![json!(entry)]);
                if self.bridge.take_dropped_operations() {
                    info!("operations were dropped before negotiation, resyncing providers");
                    for walker in self.providers.values_mut().filter_map(Provider::walker_mut) {
                        walker.forget_mirror();
                    }
                }
                Ok(entry)
            }
            Err(e) => {
                warn!(counterpart, error = %e, "inspector protocol rejected");
                Err(e.into())
            }
        }
    }

    pub fn on_provider_attached(
        &mut self,
        registration: ProviderRegistration,
    ) -> Result<(), AgentError> {
        let source_id = registration.source_id;
        if self.providers.contains_key(&source_id) {
            warn!(source_id, "provider attached twice");
            return Err(AgentError::DuplicateSource(source_id));
        }
        let provider = Provider::attach(
            registration,
            &self.options.filters,
            self.options.walker,
            self.clock.clone(),
        );
        if provider.is_supported() {
            self.bridge
                .send(events::PROVIDER_ATTACHED, vec![json!(registration)]);
            self.load_selection(source_id);
        } else if self.announced_unsupported.insert(source_id) {
            self.bridge
                .send(events::UNSUPPORTED_PROVIDER, vec![json!(registration)]);
        }
        self.providers.insert(source_id, provider);
        Ok(())
    }

    pub fn on_provider_detached(&mut self, source_id: SourceId) {
        if self.providers.remove(&source_id).is_none() {
            warn!(source_id, "detach of unknown source");
            return;
        }
        self.pending_selection.remove(&source_id);
        info!(source_id, "provider detached");
        self.bridge
            .send(events::PROVIDER_DETACHED, vec![json!({ "sourceId": source_id })]);
    }

    pub fn on_commit_start(&mut self, source_id: SourceId, priority: Option<u32>) {
        if let Some(walker) = walker_for(&mut self.providers, source_id, "commitStart") {
            walker.on_commit_start(priority);
        }
    }

    /// Reconcile a committed root and hand the flush to the bridge.
    ///
    /// Only an identity invariant violation is an error.
    pub fn on_commit_end(
        &mut self,
        source_id: SourceId,
        tree: &dyn HostTree,
        root: NodeRef,
    ) -> Result<(), AgentError> {
        let Some(walker) = walker_for(&mut self.providers, source_id, "commitEnd") else {
            return Ok(());
        };
        let outcome = walker.on_commit_end(tree, root)?;
        if let Some(message) = outcome.message {
            self.bridge.send_operations(&message);
        }
        if outcome.mounted_root.is_some() {
            self.restore_selection(source_id, tree);
        }
        Ok(())
    }

    pub fn on_node_unmounted(&mut self, source_id: SourceId, tree: &dyn HostTree, node: NodeRef) {
        let Some(walker) = walker_for(&mut self.providers, source_id, "nodeUnmounted") else {
            return;
        };
        if let Some(message) = walker.on_node_unmounted(tree, node) {
            self.bridge.send_operations(&message);
        }
    }

    pub fn on_console_message(
        &mut self,
        source_id: SourceId,
        tree: &dyn HostTree,
        node: NodeRef,
        level: ConsoleLevel,
    ) {
        if let Some(walker) = walker_for(&mut self.providers, source_id, "consoleMessage") {
            walker.on_console_message(tree, node, level);
        }
    }

    /// Accept an inbound envelope and route the command it carries.
    /// Malformed commands are logged and dropped.
    pub fn receive(
        &mut self,
        envelope: Envelope,
        backend: &mut dyn HostBackend,
    ) -> Result<(), AgentError> {
        let Some(envelope) = self.bridge.receive(envelope) else {
            return Ok(());
        };
        match Command::from_envelope(&envelope) {
            Ok(command) => self.handle_command(command, backend),
            Err(e) => {
                warn!(event = %envelope.event, error = %e, "dropping malformed command");
                Ok(())
            }
        }
    }

    pub fn handle_command(
        &mut self,
        command: Command,
        backend: &mut dyn HostBackend,
    ) -> Result<(), AgentError> {
        debug!(command = command.name(), source_id = ?command.source_id(), "command");
        match command {
            Command::InspectNode {
                source_id,
                node_id,
                path,
            } => {
                let Some(walker) = walker_for(&mut self.providers, source_id, "inspectNode") else {
                    return Ok(());
                };
                let Some(tree) = tree_for(backend, source_id) else {
                    return Ok(());
                };
                let reply = match walker.inspect(tree, node_id, &path) {
                    Some(node) => json!({ "sourceId": source_id, "type": "full", "value": node }),
                    None => {
                        warn!(source_id, %node_id, "inspect of unknown node");
                        json!({ "sourceId": source_id, "id": node_id, "type": "not-found" })
                    }
                };
                self.bridge.send(events::INSPECTED_NODE, vec![reply]);
            }
            Command::OverrideValue {
                source_id,
                node_id,
                path,
                value,
            } => {
                let Some(walker) = walker_for(&mut self.providers, source_id, "overrideValue")
                else {
                    return Ok(());
                };
                let node = match tree_for(backend, source_id) {
                    Some(tree) => walker.node_for_id(tree, node_id),
                    None => return Ok(()),
                };
                let Some(node) = node else {
                    warn!(source_id, %node_id, "override of unknown node");
                    return Ok(());
                };
                if !backend.override_value(source_id, node, &path, value) {
                    warn!(source_id, %node_id, ?path, "host rejected override");
                }
            }
            Command::SetFilters { source_id, filters } => {
                let Some(walker) = walker_for(&mut self.providers, source_id, "setFilters") else {
                    return Ok(());
                };
                let Some(tree) = tree_for(backend, source_id) else {
                    return Ok(());
                };
                for message in walker.set_filters(tree, &filters)? {
                    self.bridge.send_operations(&message);
                }
            }
            Command::StartProfiling { source_id } => {
                if let Some(walker) = walker_for(&mut self.providers, source_id, "startProfiling") {
                    walker.start_profiling();
                }
            }
            Command::StopProfiling { source_id } => {
                if let Some(walker) = walker_for(&mut self.providers, source_id, "stopProfiling") {
                    let data = walker.stop_profiling();
                    self.bridge.send(events::PROFILING_DATA, vec![json!(data)]);
                }
            }
            Command::SelectNode { source_id, node_id } => {
                let Some(walker) = walker_for(&mut self.providers, source_id, "selectNode") else {
                    return Ok(());
                };
                let Some(tree) = tree_for(backend, source_id) else {
                    return Ok(());
                };
                match walker.path_for_id(tree, node_id) {
                    Some(path) => self
                        .preferences
                        .set(&selection_key(source_id), json!(path)),
                    None => warn!(source_id, %node_id, "selection of unknown node"),
                }
            }
            Command::ClearErrorsAndWarnings { source_id, node_id } => {
                let Some(walker) =
                    walker_for(&mut self.providers, source_id, "clearErrorsAndWarnings")
                else {
                    return Ok(());
                };
                if let Some(message) = walker.clear_errors_and_warnings(node_id) {
                    self.bridge.send_operations(&message);
                }
            }
            Command::GetBridgeProtocol => {
                let protocol = self.bridge.protocol().unwrap_or_else(current_protocol);
                self.bridge
                    .send(events::BRIDGE_PROTOCOL, vec![json!(protocol)]);
            }
            Command::Shutdown => self.shutdown(),
        }
        Ok(())
    }

    /// Send every supported provider's roots that the mirror does not hold.
    pub fn remount(&mut self, backend: &dyn HostBackend) -> Result<(), AgentError> {
        for (&source_id, provider) in self.providers.iter_mut() {
            let Some(walker) = provider.walker_mut() else {
                continue;
            };
            let Some(tree) = tree_for(backend, source_id) else {
                continue;
            };
            for message in walker.remount(tree)? {
                self.bridge.send_operations(&message);
            }
        }
        Ok(())
    }

    /// Run every due timer: walker sweeps and aggregation, then the bridge.
    pub fn tick(&mut self, now: u64) {
        for provider in self.providers.values_mut() {
            let Some(walker) = provider.walker_mut() else {
                continue;
            };
            for message in walker.tick(now) {
                self.bridge.send_operations(&message);
            }
        }
        self.bridge.tick(now);
    }

    pub fn next_deadline(&self) -> Option<u64> {
        earliest(
            self.providers
                .values()
                .filter_map(Provider::walker)
                .map(Walker::next_deadline)
                .chain(std::iter::once(self.bridge.next_deadline())),
        )
    }

    /// Terminal. Providers are unregistered and the bridge drains.
    pub fn shutdown(&mut self) {
        if self.bridge.is_shut_down() {
            return;
        }
        self.providers.clear();
        self.pending_selection.clear();
        self.bridge.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.bridge.is_shut_down()
    }

    fn load_selection(&mut self, source_id: SourceId) {
        let Some(stored) = self.preferences.get(&selection_key(source_id)) else {
            return;
        };
        match serde_json::from_value::<Vec<PathFrame>>(stored) {
            Ok(path) if !path.is_empty() => {
                self.pending_selection.insert(source_id, path);
            }
            Ok(_) => {}
            Err(e) => warn!(source_id, error = %e, "ignoring unreadable stored selection"),
        }
    }

    fn restore_selection(&mut self, source_id: SourceId, tree: &dyn HostTree) {
        let Some(path) = self.pending_selection.get(&source_id) else {
            return;
        };
        let Some(walker) = self.providers.get(&source_id).and_then(Provider::walker) else {
            return;
        };
        let Some(found) = walker.resolve_path(tree, path) else {
            return;
        };
        self.pending_selection.remove(&source_id);
        self.bridge.send(
            events::SELECT_NODE,
            vec![json!({
                "sourceId": source_id,
                "id": found.id,
                "isFullMatch": found.is_full_match,
            })],
        );
    }

    /// Persisted selection path for `source_id`.
    pub fn stored_selection(&self, source_id: SourceId) -> Option<Value> {
        self.preferences.get(&selection_key(source_id))
    }
}

/// Walker for `source_id`, logging why there is none.
fn walker_for<'a>(
    providers: &'a mut BTreeMap<SourceId, Provider>,
    source_id: SourceId,
    what: &str,
) -> Option<&'a mut Walker> {
    match providers.get_mut(&source_id) {
        Some(provider) => {
            let walker = provider.walker_mut();
            if walker.is_none() {
                debug!(source_id, what, "ignoring unsupported source");
            }
            walker
        }
        None => {
            warn!(source_id, what, "unknown source");
            None
        }
    }
}

fn tree_for(backend: &dyn HostBackend, source_id: SourceId) -> Option<&dyn HostTree> {
    let tree = backend.tree(source_id);
    if tree.is_none() {
        warn!(source_id, "host has no tree for source");
    }
    tree
}
