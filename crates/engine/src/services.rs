// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared handles threaded through managers, workers, and loops.

use crate::bus::EventBus;
use crate::error::EngineError;
use crate::queue::QueueManager;
use quaero_core::{Clock, Event, Job, JobId, JobSeed, JobStatus, QueueMessage, SharedClock};
use quaero_storage::JobStore;

/// Job store specialized to the engine's shared clock.
pub type Jobs = JobStore<SharedClock>;

/// The bundle every engine component works against.
#[derive(Clone)]
pub struct Services {
    pub jobs: Jobs,
    pub queue: QueueManager,
    pub bus: EventBus,
    pub clock: SharedClock,
}

impl Services {
    /// Create a child job and enqueue its message in one logical
    /// operation, announcing the spawn on the bus.
    pub fn spawn_child_job(
        &self,
        parent_id: &JobId,
        seed: JobSeed,
        depth: u32,
        url: Option<&str>,
    ) -> Result<Job, EngineError> {
        let job = self.jobs.create_child_job(parent_id, seed)?;
        let now = self.clock.epoch_ms();
        self.queue.enqueue(QueueMessage::for_job(&job, depth, now))?;
        self.bus.publish(Event::JobSpawned {
            parent_job_id: parent_id.clone(),
            child_job_id: job.id.clone(),
            job_type: job.job_type.clone(),
            url: url.map(str::to_string),
            depth,
            timestamp_ms: now,
        });
        Ok(job)
    }

    /// Status transition + status_changed event.
    pub fn transition(&self, id: &JobId, to: JobStatus) -> Result<Job, EngineError> {
        let (old, job) = self.jobs.set_status(id, to)?;
        self.publish_status(id, old, to);
        Ok(job)
    }

    /// Status transition that tolerates an already-terminal record.
    ///
    /// Used where a concurrent cancel may legally win the race (worker
    /// completing while the tree is being cancelled).
    pub fn transition_if_live(&self, id: &JobId, to: JobStatus) -> Result<Option<Job>, EngineError> {
        match self.jobs.set_status(id, to) {
            Ok((old, job)) => {
                self.publish_status(id, old, to);
                Ok(Some(job))
            }
            Err(quaero_storage::StorageError::InvalidTransition(e)) => {
                tracing::debug!(job_id = %id, from = %e.from, to = %e.to, "transition lost race, keeping terminal status");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fail a job with error text + status_changed event.
    pub fn fail(&self, id: &JobId, error: impl Into<String>) -> Result<Job, EngineError> {
        let (old, job) = self.jobs.set_error(id, error)?;
        self.publish_status(id, old, JobStatus::Failed);
        Ok(job)
    }

    pub fn publish_status(&self, id: &JobId, old: JobStatus, new: JobStatus) {
        if old != new {
            self.bus.publish(Event::StatusChanged {
                job_id: id.clone(),
                old,
                new,
                timestamp_ms: self.clock.epoch_ms(),
            });
        }
    }

    /// Progress update + job_progress event.
    pub fn progress(&self, id: &JobId, current: u64, total: u64) -> Result<Job, EngineError> {
        let job = self.jobs.update_progress(id, current, total)?;
        self.bus.publish(Event::JobProgress {
            job_id: id.clone(),
            current,
            total,
            timestamp_ms: self.clock.epoch_ms(),
        });
        Ok(job)
    }

    /// Append to the job log + job_log event.
    pub fn log(
        &self,
        id: &JobId,
        level: quaero_core::LogLevel,
        message: impl Into<String>,
    ) -> Result<(), EngineError> {
        let entry = self.jobs.append_log(id, level, message)?;
        self.bus.publish(Event::JobLog {
            job_id: id.clone(),
            level,
            message: entry.message,
            timestamp_ms: entry.timestamp_ms,
        });
        Ok(())
    }

    /// Cancel a job tree, emitting status_changed per transitioned record.
    pub fn cancel_tree(&self, id: &JobId) -> Result<usize, EngineError> {
        let transitions = self.jobs.cancel_job(id)?;
        let count = transitions.len();
        for (old, job) in transitions {
            self.publish_status(&job.id, old, JobStatus::Cancelled);
        }
        Ok(count)
    }
}
