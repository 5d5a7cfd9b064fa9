// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker contract and its execution context.

use crate::error::EngineError;
use crate::services::Services;
use async_trait::async_trait;
use quaero_core::{Clock, Event, Job, JobId, JobSeed, LogLevel};
use quaero_storage::Receipt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One queue consumer implementation, registered by routing tag.
///
/// Workers read their own job, write documents through adapters, append
/// logs, emit events, and may spawn sibling child jobs. They never mutate
/// other job records directly — aggregation is the monitor's business.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Routing key, e.g. `"crawler_url"`.
    fn worker_type(&self) -> &str;

    /// Static checks on the job's type and payload shape.
    fn validate(&self, job: &Job) -> Result<(), EngineError>;

    /// Perform the work. The returned JSON becomes the job's result.
    async fn execute(&self, ctx: &WorkerContext) -> Result<serde_json::Value, EngineError>;
}

/// Per-execution handle given to a worker.
pub struct WorkerContext {
    /// Snapshot of the job being executed.
    pub job: Job,
    /// Nesting level of the message that delivered this job.
    pub depth: u32,
    services: Services,
    receipt: Receipt,
    cancel: CancellationToken,
}

impl WorkerContext {
    pub fn new(
        job: Job,
        depth: u32,
        services: Services,
        receipt: Receipt,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job,
            depth,
            services,
            receipt,
            cancel,
        }
    }

    /// Cooperative cancellation checkpoint.
    ///
    /// True when the pool is shutting down or the job (or its tree) was
    /// cancelled out from under the worker.
    pub fn is_cancelled(&self) -> bool {
        if self.cancel.is_cancelled() {
            return true;
        }
        self.services
            .jobs
            .get(&self.job.id)
            .map(|job| job.status == quaero_core::JobStatus::Cancelled)
            .unwrap_or(false)
    }

    /// Fails with [`EngineError::Cancelled`] at a checkpoint.
    pub fn checkpoint(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Append to this job's log stream (also emitted on the bus).
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if let Err(e) = self.services.log(&self.job.id, level, message) {
            tracing::warn!(job_id = %self.job.id, error = %e, "job log append failed");
        }
    }

    /// Report progress on this job.
    pub fn progress(&self, current: u64, total: u64) {
        if let Err(e) = self.services.progress(&self.job.id, current, total) {
            tracing::debug!(job_id = %self.job.id, error = %e, "progress update rejected");
        }
    }

    /// Spawn a sibling child (same parent as this job) and enqueue it at
    /// `depth + 1`.
    pub fn spawn_child(&self, seed: JobSeed, url: Option<&str>) -> Result<Job, EngineError> {
        let parent_id = self
            .job
            .parent_id
            .clone()
            .ok_or_else(|| EngineError::Execution("job has no parent to spawn under".to_string()))?;
        self.services
            .spawn_child_job(&parent_id, seed, self.depth + 1, url)
    }

    /// Push this message's visibility deadline forward (long executions).
    pub fn extend_visibility(&self, duration: Duration) -> Result<(), EngineError> {
        self.services.queue.extend(&self.receipt, duration)
    }

    /// Publish an arbitrary event.
    pub fn publish(&self, event: Event) {
        self.services.bus.publish(event);
    }

    pub fn job_id(&self) -> &JobId {
        &self.job.id
    }

    pub fn now_ms(&self) -> u64 {
        self.services.clock.epoch_ms()
    }

    /// Compact the job and queue WALs (maintenance worker).
    pub fn compact_storage(&self) -> Result<(), EngineError> {
        self.services.jobs.compact()?;
        self.services.queue.compact()?;
        Ok(())
    }
}
