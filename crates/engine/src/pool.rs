// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-size worker pool.
//!
//! N identical scheduler loops pull from the queue and dispatch to the
//! registered worker for the message's type. Worker code runs in its own
//! task behind a panic barrier: a panic fails that job and never reaches
//! sibling loops. The queue delete always runs detached from the receive
//! context (see `queue::QueueManager::delete`).

use crate::error::EngineError;
use crate::registry::WorkerRegistry;
use crate::services::Services;
use crate::worker::WorkerContext;
use quaero_core::{JobStatus, QueueMessage};
use quaero_storage::Receipt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub concurrency: u32,
    pub shutdown_grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

pub struct WorkerPool {
    services: Services,
    registry: Arc<WorkerRegistry>,
    config: PoolConfig,
    cancel: CancellationToken,
    handles: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(services: Services, registry: Arc<WorkerRegistry>, config: PoolConfig) -> Self {
        Self {
            services,
            registry,
            config,
            cancel: CancellationToken::new(),
            handles: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn concurrency(&self) -> u32 {
        self.config.concurrency
    }

    /// Spawn the scheduler loops.
    pub fn start(&self) {
        let mut handles = self.handles.lock();
        if !handles.is_empty() {
            tracing::warn!("worker pool already started");
            return;
        }
        for index in 0..self.config.concurrency {
            let services = self.services.clone();
            let registry = Arc::clone(&self.registry);
            let cancel = self.cancel.clone();
            handles.push(tokio::spawn(async move {
                scheduler_loop(services, registry, cancel, index).await;
            }));
        }
        tracing::info!(concurrency = self.config.concurrency, "worker pool started");
    }

    /// Cancel the loops and wait up to the shutdown grace period.
    ///
    /// Loops still executing after the grace are abandoned; their
    /// messages re-deliver once visibility lapses.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        let drain = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(self.config.shutdown_grace, drain)
            .await
            .is_err()
        {
            tracing::warn!(
                grace = ?self.config.shutdown_grace,
                "worker pool shutdown grace elapsed, abandoning in-flight workers"
            );
        } else {
            tracing::info!("worker pool stopped");
        }
    }
}

async fn scheduler_loop(
    services: Services,
    registry: Arc<WorkerRegistry>,
    cancel: CancellationToken,
    index: u32,
) {
    tracing::debug!(scheduler = index, "scheduler loop started");
    loop {
        let (message, receipt) = match services.queue.receive(&cancel).await {
            Ok(claimed) => claimed,
            Err(EngineError::Cancelled) => break,
            Err(e) => {
                tracing::warn!(scheduler = index, error = %e, "receive failed");
                continue;
            }
        };
        process_message(&services, &registry, &cancel, message, receipt).await;
    }
    tracing::debug!(scheduler = index, "scheduler loop stopped");
}

/// One full dispatch of a claimed message. Never returns an error — every
/// failure mode ends in a job-record update and/or a queue decision.
pub(crate) async fn process_message(
    services: &Services,
    registry: &WorkerRegistry,
    cancel: &CancellationToken,
    message: QueueMessage,
    receipt: Receipt,
) {
    let Some(job) = services.jobs.get(&message.job_id) else {
        tracing::warn!(message_id = %message.id, job_id = %message.job_id, "message references missing job, deleting");
        delete_quiet(services, &receipt).await;
        return;
    };

    // Parent records are monitored, never executed; a parent message can
    // only be an erroneous duplicate enqueue.
    if job.parent_id.is_none() {
        tracing::warn!(job_id = %job.id, "parent job found on the queue, deleting message");
        delete_quiet(services, &receipt).await;
        return;
    }

    // Redelivered finished work and cancelled trees short-circuit here
    if job.is_terminal() {
        tracing::info!(job_id = %job.id, status = %job.status, "job already terminal, deleting message");
        delete_quiet(services, &receipt).await;
        return;
    }

    let Some(worker) = registry.get(&message.job_type) else {
        if let Err(e) = services.fail(&job.id, format!("no worker for type '{}'", message.job_type)) {
            tracing::error!(job_id = %job.id, error = %e, "unable to record routing failure");
        }
        delete_quiet(services, &receipt).await;
        return;
    };

    if let Err(validation) = worker.validate(&job) {
        if let Err(e) = services.fail(&job.id, validation.to_string()) {
            tracing::error!(job_id = %job.id, error = %e, "unable to record validation failure");
        }
        delete_quiet(services, &receipt).await;
        return;
    }

    let job = if job.status == JobStatus::Pending {
        match services.transition(&job.id, JobStatus::Running) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "job vanished before start, deleting message");
                delete_quiet(services, &receipt).await;
                return;
            }
        }
    } else {
        job
    };

    let job_id = job.id.clone();
    let ctx = WorkerContext::new(
        job,
        message.depth,
        services.clone(),
        receipt.clone(),
        cancel.child_token(),
    );
    // Panic barrier: the worker future runs in its own task so a panic
    // surfaces as a JoinError instead of unwinding this loop
    let barrier = tokio::spawn(async move { worker.execute(&ctx).await });

    match barrier.await {
        Ok(Ok(result)) => {
            if let Err(e) = services.jobs.set_result(&job_id, result) {
                tracing::warn!(job_id = %job_id, error = %e, "unable to store job result");
            }
            match services.transition_if_live(&job_id, JobStatus::Completed) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::debug!(job_id = %job_id, "job finished after cancellation, keeping cancelled status");
                }
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "unable to record completion");
                }
            }
        }
        Ok(Err(error)) if error.is_cancellation() => {
            if cancel.is_cancelled() {
                // Shutdown: leave the message claimed; visibility expiry
                // re-delivers it after restart
                tracing::info!(job_id = %job_id, "shutdown interrupted execution, message left for redelivery");
                return;
            }
            if let Err(e) = services.transition_if_live(&job_id, JobStatus::Cancelled) {
                tracing::error!(job_id = %job_id, error = %e, "unable to record cancellation");
            }
        }
        Ok(Err(error)) => {
            tracing::warn!(job_id = %job_id, error = %error, "worker execution failed");
            if let Err(e) = services.fail(&job_id, error.to_string()) {
                tracing::error!(job_id = %job_id, error = %e, "unable to record execution failure");
            }
        }
        Err(join_error) => {
            if !join_error.is_panic() {
                // Task aborted during shutdown; redelivery handles it
                return;
            }
            let panic_text = panic_message(join_error.into_panic());
            tracing::error!(job_id = %job_id, panic = %panic_text, "worker panicked");
            if let Err(e) = services.fail(&job_id, format!("worker panicked: {panic_text}")) {
                tracing::error!(job_id = %job_id, error = %e, "unable to record panic failure");
            }
        }
    }

    delete_quiet(services, &receipt).await;
}

async fn delete_quiet(services: &Services, receipt: &Receipt) {
    if let Err(e) = services.queue.delete(receipt).await {
        tracing::warn!(message_id = %receipt.message_id, error = %e, "queue delete failed, message will redeliver");
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
