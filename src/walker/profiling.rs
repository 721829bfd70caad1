//! Per-commit profiling data.

use crate::host::NodeDurations;
use crate::types::{SourceId, StableId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTiming {
    pub id: StableId,
    pub actual_ms: f64,
    pub self_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitProfile {
    pub priority: Option<u32>,
    pub commit_time_ms: u64,
    pub duration_ms: u64,
    pub durations: Vec<NodeTiming>,
}

/// Everything recorded between `startProfiling` and `stopProfiling`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilingData {
    pub source_id: SourceId,
    pub started_at_ms: u64,
    pub commits: Vec<CommitProfile>,
}

#[derive(Debug, Default)]
pub(super) struct ProfilingState {
    active: bool,
    started_at: u64,
    commits: Vec<CommitProfile>,
    current: Vec<NodeTiming>,
}

impl ProfilingState {
    pub(super) fn is_active(&self) -> bool {
        self.active
    }

    pub(super) fn start(&mut self, now: u64) {
        self.active = true;
        self.started_at = now;
        self.commits.clear();
        self.current.clear();
    }

    pub(super) fn stop(&mut self, source_id: SourceId) -> ProfilingData {
        self.active = false;
        self.current.clear();
        ProfilingData {
            source_id,
            started_at_ms: self.started_at,
            commits: std::mem::take(&mut self.commits),
        }
    }

    pub(super) fn record(&mut self, id: StableId, durations: &NodeDurations) {
        self.current.push(NodeTiming {
            id,
            actual_ms: durations.actual_ms,
            self_ms: durations.self_ms,
        });
    }

    pub(super) fn finish_commit(&mut self, priority: Option<u32>, started_at: u64, now: u64) {
        self.commits.push(CommitProfile {
            priority,
            commit_time_ms: now,
            duration_ms: now.saturating_sub(started_at),
            durations: std::mem::take(&mut self.current),
        });
    }
}

impl super::Walker {
    pub fn start_profiling(&mut self) {
        let now = self.now();
        self.profiling.start(now);
    }

    pub fn stop_profiling(&mut self) -> ProfilingData {
        self.profiling.stop(self.source_id)
    }

    pub fn is_profiling(&self) -> bool {
        self.profiling.is_active()
    }
}
