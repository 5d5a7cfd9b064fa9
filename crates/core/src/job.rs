// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and status machine.

use crate::id::JobId;
use serde::{Deserialize, Serialize};

/// Status of a job execution record.
///
/// Transitions form a DAG: `Pending → Running → {Completed, Failed,
/// Cancelled}`, with `Pending → {Failed, Cancelled}` also legal (a job
/// that fails validation or is cancelled before a worker picks it up).
/// There are no back-transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the status machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running) => true,
            (Self::Pending, Self::Failed | Self::Cancelled) => true,
            (Self::Running, Self::Completed | Self::Failed | Self::Cancelled) => true,
            _ => false,
        }
    }
}

/// Rejected status transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status transition for {job_id}: {from} -> {to}")]
pub struct TransitionError {
    pub job_id: JobId,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// What a parent does once its children exceed the failure budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    /// Cancel remaining siblings and fail the parent.
    #[default]
    StopAll,
    /// Ignore the breach and keep going.
    Continue,
    /// Complete the parent with a warning flag.
    MarkWarning,
}

crate::simple_display! {
    FailureAction {
        StopAll => "stop_all",
        Continue => "continue",
        MarkWarning => "mark_warning",
    }
}

/// Per-parent error budget for child failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTolerance {
    /// Failures allowed before `failure_action` applies. `0` means
    /// unlimited — explicitly not "fail on first".
    #[serde(default)]
    pub max_child_failures: u32,
    #[serde(default)]
    pub failure_action: FailureAction,
}

impl ErrorTolerance {
    pub fn is_breached(&self, failed_children: u64) -> bool {
        self.max_child_failures != 0 && failed_children > u64::from(self.max_child_failures)
    }
}

/// Creation parameters for a job record.
///
/// The store stamps id, timestamps, and zeroed progress; callers describe
/// only what the job is.
#[derive(Debug, Clone, Default)]
pub struct JobSeed {
    pub parent_id: Option<JobId>,
    pub definition_id: Option<String>,
    pub name: String,
    pub job_type: String,
    pub step_index: Option<usize>,
    pub payload: serde_json::Value,
    pub tolerance: Option<ErrorTolerance>,
}

impl JobSeed {
    pub fn new(name: impl Into<String>, job_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            job_type: job_type.into(),
            ..Self::default()
        }
    }

    pub fn parent(mut self, id: JobId) -> Self {
        self.parent_id = Some(id);
        self
    }

    pub fn definition(mut self, id: impl Into<String>) -> Self {
        self.definition_id = Some(id.into());
        self
    }

    pub fn step_index(mut self, index: usize) -> Self {
        self.step_index = Some(index);
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn tolerance(mut self, tolerance: ErrorTolerance) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
}

/// One job execution record.
///
/// A record with `parent_id = None` is a parent (root or step parent);
/// anything else is a child task consumed from the queue. Records are
/// owned by the job store — everything outside it holds read-only
/// snapshots and mutates through the store's API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<JobId>,
    /// Definition that produced this record, for log attribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_id: Option<String>,
    pub name: String,
    /// Routing tag: selects the worker that executes this job.
    pub job_type: String,
    /// Which step of the definition produced it (step parents only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    pub status: JobStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    /// Opaque configuration handed to the worker.
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub progress_current: u64,
    #[serde(default)]
    pub progress_total: u64,
    /// Successful output, JSON-serialized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when a `mark_warning` tolerance fired; the job still completes.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub warning: bool,
    /// Error budget for children (parents only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<ErrorTolerance>,
}

impl Job {
    /// Materialize a record from its seed. Progress starts at 0/0.
    pub fn create(seed: JobSeed, now_ms: u64) -> Self {
        Self {
            id: JobId::generate(),
            parent_id: seed.parent_id,
            definition_id: seed.definition_id,
            name: seed.name,
            job_type: seed.job_type,
            step_index: seed.step_index,
            status: JobStatus::Pending,
            created_at_ms: now_ms,
            started_at_ms: None,
            completed_at_ms: None,
            payload: seed.payload,
            progress_current: 0,
            progress_total: 0,
            result: None,
            error: None,
            warning: false,
            tolerance: seed.tolerance,
        }
    }

    pub fn is_parent(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a validated status transition, stamping timestamps.
    ///
    /// `started_at_ms` is set on first entry to `Running`; `completed_at_ms`
    /// on entry to any terminal status.
    pub fn transition(&mut self, to: JobStatus, now_ms: u64) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                job_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        match to {
            JobStatus::Running => {
                if self.started_at_ms.is_none() {
                    self.started_at_ms = Some(now_ms);
                }
            }
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => {
                self.completed_at_ms = Some(now_ms);
            }
            JobStatus::Pending => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
