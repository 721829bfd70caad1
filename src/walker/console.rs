//! Error/warning count aggregation.
//!
//! Console messages only bump counters; changed counts go out together
//! once the aggregation delay elapses.

use super::Walker;
use crate::host::HostTree;
use crate::ops::Operation;
use crate::ticker::Ticker;
use crate::types::{NodeRef, StableId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleLevel {
    Error,
    Warning,
}

#[derive(Debug, Default)]
pub(super) struct ConsoleCounts {
    counts: HashMap<StableId, (u32, u32)>,
    dirty: BTreeSet<StableId>,
    flush: Ticker,
    delay_ms: u64,
}

impl ConsoleCounts {
    pub(super) fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::default()
        }
    }

    fn bump(&mut self, id: StableId, level: ConsoleLevel, now: u64) {
        let (errors, warnings) = self.counts.entry(id).or_insert((0, 0));
        match level {
            ConsoleLevel::Error => *errors += 1,
            ConsoleLevel::Warning => *warnings += 1,
        }
        self.dirty.insert(id);
        self.flush.arm_if_idle(now + self.delay_ms);
    }

    fn clear(&mut self, id: Option<StableId>) {
        let cleared: Vec<StableId> = match id {
            Some(id) => self.counts.remove(&id).map(|_| id).into_iter().collect(),
            None => self.counts.drain().map(|(id, _)| id).collect(),
        };
        self.dirty.extend(cleared);
    }

    pub(super) fn forget(&mut self, id: StableId) {
        self.counts.remove(&id);
        self.dirty.remove(&id);
    }

    pub(super) fn take_due(&mut self, now: u64) -> bool {
        self.flush.take_due(now)
    }

    pub(super) fn deadline(&self) -> Option<u64> {
        self.flush.deadline()
    }

    pub(super) fn counts_for(&self, id: StableId) -> (u32, u32) {
        self.counts.get(&id).copied().unwrap_or((0, 0))
    }
}

impl Walker {
    /// Attribute a console error or warning to `node`.
    pub fn on_console_message(&mut self, tree: &dyn HostTree, node: NodeRef, level: ConsoleLevel) {
        let Some(id) = self.registry.get(tree, node) else {
            warn!(%node, ?level, "console message for untracked node");
            return;
        };
        if self.is_filtered(tree, node) {
            debug!(%node, %id, ?level, "console message for filtered node");
            return;
        }
        let now = self.now();
        self.console.bump(id, level, now);
    }

    /// Reset counts for one node, or for every node, and flush right away.
    pub fn clear_errors_and_warnings(&mut self, id: Option<StableId>) -> Option<Vec<u32>> {
        self.console.clear(id);
        self.console.flush.cancel();
        self.flush_console()
    }

    pub fn error_warning_counts(&self, id: StableId) -> (u32, u32) {
        self.console.counts_for(id)
    }

    pub(super) fn flush_console(&mut self) -> Option<Vec<u32>> {
        let dirty = std::mem::take(&mut self.console.dirty);
        for id in dirty {
            if self.unmounted.contains(&id) {
                continue;
            }
            let (errors, warnings) = self.console.counts_for(id);
            self.encoder.push_op(Operation::UpdateErrorWarningCounts {
                id,
                errors,
                warnings,
            });
        }
        self.flush_pending()
    }
}
