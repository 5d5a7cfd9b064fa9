// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record store: lifecycle, status, progress, logs, aggregation.
//!
//! The store is the sole writer of job and log rows. Every mutation is
//! validated against materialized state, appended to `jobs.wal`, and then
//! applied — so replay on open reproduces exactly the accepted history.
//! Callers receive cloned snapshots, never references into the state.

use crate::error::StorageError;
use crate::snapshot;
use crate::wal::Wal;
use parking_lot::Mutex;
use quaero_core::{
    Clock, Job, JobId, JobLogEntry, JobSeed, JobStatus, LogLevel, StatusCounts, SystemClock,
    TreeStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const WAL_FILE: &str = "jobs.wal";
const SNAPSHOT_FILE: &str = "jobs.snapshot";

/// WAL record for one accepted job-store mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JobRecord {
    Created {
        job: Job,
    },
    StatusChanged {
        id: JobId,
        status: JobStatus,
        at_ms: u64,
    },
    ProgressUpdated {
        id: JobId,
        current: u64,
        total: u64,
    },
    ErrorSet {
        id: JobId,
        error: String,
        at_ms: u64,
    },
    ResultSet {
        id: JobId,
        result: serde_json::Value,
    },
    WarningSet {
        id: JobId,
    },
    LogAppended {
        entry: JobLogEntry,
    },
    Deleted {
        id: JobId,
    },
}

/// Materialized job state rebuilt from snapshot + WAL replay.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct JobState {
    jobs: HashMap<JobId, Job>,
    #[serde(default)]
    logs: HashMap<JobId, Vec<JobLogEntry>>,
}

impl JobState {
    /// Apply one record. Replay-safe: records were validated before they
    /// were appended, so application is unconditional field assignment.
    fn apply(&mut self, record: &JobRecord) {
        match record {
            JobRecord::Created { job } => {
                // Guarded insert keeps re-applied history idempotent
                self.jobs.entry(job.id.clone()).or_insert_with(|| job.clone());
            }
            JobRecord::StatusChanged { id, status, at_ms } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    job.status = *status;
                    match status {
                        JobStatus::Running => {
                            if job.started_at_ms.is_none() {
                                job.started_at_ms = Some(*at_ms);
                            }
                        }
                        s if s.is_terminal() => {
                            job.completed_at_ms = Some(*at_ms);
                        }
                        _ => {}
                    }
                }
            }
            JobRecord::ProgressUpdated { id, current, total } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    job.progress_current = *current;
                    job.progress_total = *total;
                }
            }
            JobRecord::ErrorSet { id, error, at_ms } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    job.error = Some(error.clone());
                    job.status = JobStatus::Failed;
                    if job.completed_at_ms.is_none() {
                        job.completed_at_ms = Some(*at_ms);
                    }
                }
            }
            JobRecord::ResultSet { id, result } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    job.result = Some(result.clone());
                }
            }
            JobRecord::WarningSet { id } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    job.warning = true;
                }
            }
            JobRecord::LogAppended { entry } => {
                self.logs
                    .entry(entry.job_id.clone())
                    .or_default()
                    .push(entry.clone());
            }
            JobRecord::Deleted { id } => {
                self.jobs.remove(id);
                self.logs.remove(id);
            }
        }
    }

    /// Ids of `id` plus every transitive descendant.
    fn subtree_ids(&self, id: &JobId) -> Vec<JobId> {
        let mut result = vec![id.clone()];
        let mut frontier = vec![id.clone()];
        while let Some(current) = frontier.pop() {
            for job in self.jobs.values() {
                if job.parent_id.as_ref() == Some(&current) {
                    result.push(job.id.clone());
                    frontier.push(job.id.clone());
                }
            }
        }
        result
    }
}

struct Inner {
    wal: Wal<JobRecord>,
    snapshot_path: PathBuf,
    state: JobState,
}

impl Inner {
    /// Append + apply in one step so state never diverges from the log.
    fn commit(&mut self, record: JobRecord) -> Result<(), StorageError> {
        self.wal.append(&record)?;
        self.state.apply(&record);
        Ok(())
    }
}

/// Handle to the durable job store. Cheap to clone; all clones share the
/// same serialized state.
pub struct JobStore<C: Clock = SystemClock> {
    inner: Arc<Mutex<Inner>>,
    clock: C,
}

impl<C: Clock> Clone for JobStore<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            clock: self.clock.clone(),
        }
    }
}

impl<C: Clock> JobStore<C> {
    /// Open the store in `dir`, replaying snapshot + WAL.
    pub fn open(dir: &Path, clock: C) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let (snap_seq, mut state) = snapshot::read::<JobState>(&snapshot_path)?
            .unwrap_or((0, JobState::default()));
        let (wal, entries) = Wal::open(dir.join(WAL_FILE), snap_seq)?;
        let mut replayed = 0usize;
        for entry in &entries {
            if entry.seq > snap_seq {
                state.apply(&entry.record);
                replayed += 1;
            }
        }
        tracing::debug!(jobs = state.jobs.len(), replayed, "job store opened");
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                wal,
                snapshot_path,
                state,
            })),
            clock,
        })
    }

    /// Create a root or step parent record (no queue message is implied).
    pub fn create_parent_job(&self, seed: JobSeed) -> Result<Job, StorageError> {
        self.create_job(seed)
    }

    /// Create a child record under `parent_id`.
    pub fn create_child_job(&self, parent_id: &JobId, seed: JobSeed) -> Result<Job, StorageError> {
        self.create_job(seed.parent(parent_id.clone()))
    }

    /// Create a record, validating any parent reference.
    pub fn create_job(&self, seed: JobSeed) -> Result<Job, StorageError> {
        let mut inner = self.inner.lock();
        if let Some(parent_id) = &seed.parent_id {
            if !inner.state.jobs.contains_key(parent_id) {
                return Err(StorageError::ParentNotFound(parent_id.to_string()));
            }
        }
        let job = Job::create(seed, self.clock.epoch_ms());
        inner.commit(JobRecord::Created { job: job.clone() })?;
        inner.wal.flush()?;
        Ok(job)
    }

    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.inner.lock().state.jobs.get(id).cloned()
    }

    /// Root jobs (no parent), newest first.
    pub fn list_roots(&self, offset: usize, limit: usize) -> Vec<Job> {
        let inner = self.inner.lock();
        let mut roots: Vec<Job> = inner
            .state
            .jobs
            .values()
            .filter(|j| j.parent_id.is_none())
            .cloned()
            .collect();
        roots.sort_by(|a, b| {
            b.created_at_ms
                .cmp(&a.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        roots.into_iter().skip(offset).take(limit).collect()
    }

    /// All currently running jobs (monitor scan).
    pub fn list_running(&self) -> Vec<Job> {
        let inner = self.inner.lock();
        inner
            .state
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Running)
            .cloned()
            .collect()
    }

    /// Direct children of `parent_id`, oldest first.
    pub fn list_children(&self, parent_id: &JobId) -> Vec<Job> {
        let inner = self.inner.lock();
        let mut children: Vec<Job> = inner
            .state
            .jobs
            .values()
            .filter(|j| j.parent_id.as_ref() == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        children
    }

    /// Validated status transition. Returns `(old_status, updated_job)` so
    /// callers can emit a status-changed event without a second lookup.
    pub fn set_status(
        &self,
        id: &JobId,
        to: JobStatus,
    ) -> Result<(JobStatus, Job), StorageError> {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        let job = inner
            .state
            .jobs
            .get(id)
            .ok_or_else(|| StorageError::JobNotFound(id.to_string()))?;
        let old = job.status;
        // Validate on a scratch copy; the WAL only ever sees legal history
        let mut updated = job.clone();
        updated.transition(to, now)?;
        inner.commit(JobRecord::StatusChanged {
            id: id.clone(),
            status: to,
            at_ms: now,
        })?;
        inner.wal.flush()?;
        let job = updated;
        Ok((old, job))
    }

    /// Monotonic progress update.
    ///
    /// `current` never decreases and never exceeds `total`; terminal jobs
    /// reject further progress. Buffered (no per-update fsync).
    pub fn update_progress(
        &self,
        id: &JobId,
        current: u64,
        total: u64,
    ) -> Result<Job, StorageError> {
        let mut inner = self.inner.lock();
        let job = inner
            .state
            .jobs
            .get(id)
            .ok_or_else(|| StorageError::JobNotFound(id.to_string()))?;
        if job.is_terminal() {
            return Err(StorageError::TerminalJob {
                job_id: id.to_string(),
            });
        }
        if current < job.progress_current {
            return Err(StorageError::ProgressRegression {
                job_id: id.to_string(),
                current: job.progress_current,
                requested: current,
            });
        }
        if current > total {
            return Err(StorageError::ProgressBeyondTotal {
                job_id: id.to_string(),
                current,
                total,
            });
        }
        inner.commit(JobRecord::ProgressUpdated {
            id: id.clone(),
            current,
            total,
        })?;
        Ok(inner.state.jobs[id].clone())
    }

    /// Record a failure: sets the error text and forces status=failed.
    ///
    /// Re-failing an already failed job only refreshes the text, which
    /// keeps redelivered failures idempotent.
    pub fn set_error(
        &self,
        id: &JobId,
        error: impl Into<String>,
    ) -> Result<(JobStatus, Job), StorageError> {
        let now = self.clock.epoch_ms();
        let error = error.into();
        let mut inner = self.inner.lock();
        let job = inner
            .state
            .jobs
            .get(id)
            .ok_or_else(|| StorageError::JobNotFound(id.to_string()))?;
        let old = job.status;
        if job.is_terminal() && job.status != JobStatus::Failed {
            return Err(StorageError::InvalidTransition(
                quaero_core::TransitionError {
                    job_id: id.clone(),
                    from: job.status,
                    to: JobStatus::Failed,
                },
            ));
        }
        inner.commit(JobRecord::ErrorSet {
            id: id.clone(),
            error,
            at_ms: now,
        })?;
        inner.wal.flush()?;
        Ok((old, inner.state.jobs[id].clone()))
    }

    pub fn set_result(
        &self,
        id: &JobId,
        result: serde_json::Value,
    ) -> Result<Job, StorageError> {
        let mut inner = self.inner.lock();
        if !inner.state.jobs.contains_key(id) {
            return Err(StorageError::JobNotFound(id.to_string()));
        }
        inner.commit(JobRecord::ResultSet {
            id: id.clone(),
            result,
        })?;
        Ok(inner.state.jobs[id].clone())
    }

    /// Flag a completed-with-warnings parent (`mark_warning` tolerance).
    pub fn set_warning(&self, id: &JobId) -> Result<Job, StorageError> {
        let mut inner = self.inner.lock();
        if !inner.state.jobs.contains_key(id) {
            return Err(StorageError::JobNotFound(id.to_string()));
        }
        inner.commit(JobRecord::WarningSet { id: id.clone() })?;
        Ok(inner.state.jobs[id].clone())
    }

    /// Append one line to the job's log stream. Buffered.
    pub fn append_log(
        &self,
        id: &JobId,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Result<JobLogEntry, StorageError> {
        let entry = JobLogEntry {
            job_id: id.clone(),
            timestamp_ms: self.clock.epoch_ms(),
            level,
            message: message.into(),
        };
        let mut inner = self.inner.lock();
        if !inner.state.jobs.contains_key(id) {
            return Err(StorageError::JobNotFound(id.to_string()));
        }
        inner.commit(JobRecord::LogAppended {
            entry: entry.clone(),
        })?;
        Ok(entry)
    }

    /// Log entries for a job, oldest first, optionally bounded below by
    /// `since_ms` and capped at `limit`.
    pub fn list_logs(&self, id: &JobId, limit: usize, since_ms: Option<u64>) -> Vec<JobLogEntry> {
        let inner = self.inner.lock();
        let Some(entries) = inner.state.logs.get(id) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter(|e| since_ms.is_none_or(|since| e.timestamp_ms >= since))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Per-status counts over the direct children of `parent_id`.
    pub fn count_children_by_status(&self, parent_id: &JobId) -> StatusCounts {
        let inner = self.inner.lock();
        let mut counts = StatusCounts::default();
        for job in inner.state.jobs.values() {
            if job.parent_id.as_ref() == Some(parent_id) {
                counts.record(job.status);
            }
        }
        counts
    }

    pub fn count_failed_children(&self, parent_id: &JobId) -> u64 {
        self.count_children_by_status(parent_id).failed
    }

    /// Derived subtree snapshot for a parent.
    pub fn tree_status(&self, parent_id: &JobId) -> Result<TreeStatus, StorageError> {
        let started_at = self
            .get(parent_id)
            .ok_or_else(|| StorageError::JobNotFound(parent_id.to_string()))?
            .started_at_ms;
        let counts = self.count_children_by_status(parent_id);
        Ok(TreeStatus::compute(
            counts,
            started_at,
            self.clock.epoch_ms(),
        ))
    }

    /// Cancel `id` and every non-terminal descendant.
    ///
    /// Returns the `(old_status, job)` pairs actually transitioned so the
    /// caller can emit events; already-terminal descendants are skipped.
    pub fn cancel_job(&self, id: &JobId) -> Result<Vec<(JobStatus, Job)>, StorageError> {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        if !inner.state.jobs.contains_key(id) {
            return Err(StorageError::JobNotFound(id.to_string()));
        }
        let mut transitions = Vec::new();
        for target in inner.state.subtree_ids(id) {
            let Some(job) = inner.state.jobs.get(&target) else {
                continue;
            };
            if job.is_terminal() {
                continue;
            }
            let old = job.status;
            inner.commit(JobRecord::StatusChanged {
                id: target.clone(),
                status: JobStatus::Cancelled,
                at_ms: now,
            })?;
            transitions.push((old, inner.state.jobs[&target].clone()));
        }
        inner.wal.flush()?;
        Ok(transitions)
    }

    /// Delete `id` and cascade to all descendants and their logs.
    pub fn delete_job(&self, id: &JobId) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if !inner.state.jobs.contains_key(id) {
            return Err(StorageError::JobNotFound(id.to_string()));
        }
        for target in inner.state.subtree_ids(id) {
            inner.commit(JobRecord::Deleted { id: target })?;
        }
        inner.wal.flush()?;
        Ok(())
    }

    /// Snapshot current state and truncate the replayed WAL prefix.
    pub fn compact(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        inner.wal.flush()?;
        let seq = inner.wal.write_seq();
        snapshot::write(&inner.snapshot_path, seq, &inner.state)?;
        inner.wal.truncate_before(seq + 1)?;
        tracing::info!(seq, "job store compacted");
        Ok(())
    }

    /// Force buffered appends (progress, logs) to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.inner.lock().wal.flush()
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
