// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Derived parent/child aggregates.

use crate::job::JobStatus;
use serde::{Deserialize, Serialize};

/// Child counts per status for one parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    pub fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
            JobStatus::Cancelled => self.cancelled += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.running + self.completed + self.failed + self.cancelled
    }

    /// Children that reached a terminal status. Cancelled counts as done.
    pub fn terminal(&self) -> u64 {
        self.completed + self.failed + self.cancelled
    }
}

/// Snapshot of a parent's subtree: counts, normalized progress, and a
/// linear time-remaining estimate. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeStatus {
    pub total_children: u64,
    pub counts: StatusCounts,
    /// terminal / total, in [0, 1]. A parent with no children reads 1.0.
    pub overall_progress: f64,
    /// `elapsed * remaining / terminal`; None until at least one child
    /// finishes or when the parent never started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_ms: Option<u64>,
}

impl TreeStatus {
    pub fn compute(counts: StatusCounts, started_at_ms: Option<u64>, now_ms: u64) -> Self {
        let total = counts.total();
        let done = counts.terminal();
        let overall_progress = if total == 0 {
            1.0
        } else {
            done as f64 / total as f64
        };
        let eta_ms = match (started_at_ms, done) {
            (Some(started), done) if done > 0 && total > done => {
                let elapsed = now_ms.saturating_sub(started);
                Some(elapsed * (total - done) / done)
            }
            (Some(_), done) if done == total => Some(0),
            _ => None,
        };
        Self {
            total_children: total,
            counts,
            overall_progress,
            eta_ms,
        }
    }

    pub fn all_terminal(&self) -> bool {
        self.counts.terminal() == self.total_children
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
