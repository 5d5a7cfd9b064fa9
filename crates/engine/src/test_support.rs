// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine unit tests.

use crate::bus::EventBus;
use crate::error::EngineError;
use crate::queue::QueueManager;
use crate::services::Services;
use crate::worker::{Worker, WorkerContext};
use async_trait::async_trait;
use quaero_core::{FakeClock, Job, JobSeed, QueueMessage, SharedClock};
use quaero_storage::{JobStore, QueueStore, Receipt};
use std::time::Duration;

pub(crate) struct Harness {
    pub services: Services,
    pub clock: FakeClock,
    _dir: tempfile::TempDir,
}

pub(crate) fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let shared = SharedClock::new(clock.clone());
    let jobs = JobStore::open(dir.path(), shared.clone()).unwrap();
    let queue_store = QueueStore::open(dir.path(), "jobs").unwrap();
    let queue = QueueManager::new(
        queue_store,
        shared.clone(),
        Duration::from_secs(60),
        Duration::from_millis(5),
    );
    Harness {
        services: Services {
            jobs,
            queue,
            bus: EventBus::new(),
            clock: shared,
        },
        clock,
        _dir: dir,
    }
}

/// Running step parent + pending enqueued child of `job_type`.
pub(crate) fn spawn_child_under_parent(
    services: &Services,
    job_type: &str,
    payload: serde_json::Value,
) -> (Job, Job) {
    let parent = services
        .jobs
        .create_parent_job(JobSeed::new("parent", "step"))
        .unwrap();
    let parent = services
        .transition(&parent.id, quaero_core::JobStatus::Running)
        .unwrap();
    let child = services
        .spawn_child_job(
            &parent.id,
            JobSeed::new("child", job_type).payload(payload),
            0,
            None,
        )
        .unwrap();
    (parent, child)
}

/// Claim the next message off the queue (must exist).
pub(crate) async fn claim(services: &Services) -> (QueueMessage, Receipt) {
    let cancel = tokio_util::sync::CancellationToken::new();
    services.queue.receive(&cancel).await.unwrap()
}

/// Worker scripted per test: succeed, fail, panic, or observe cancel.
pub(crate) struct ScriptedWorker {
    pub worker_type: &'static str,
    pub mode: ScriptedMode,
}

#[derive(Clone)]
pub(crate) enum ScriptedMode {
    Succeed(serde_json::Value),
    Fail(String),
    Panic(String),
    RejectValidation(String),
    WaitForCancel,
}

#[async_trait]
impl Worker for ScriptedWorker {
    fn worker_type(&self) -> &str {
        self.worker_type
    }

    fn validate(&self, _job: &Job) -> Result<(), EngineError> {
        match &self.mode {
            ScriptedMode::RejectValidation(reason) => {
                Err(EngineError::Validation(reason.clone()))
            }
            _ => Ok(()),
        }
    }

    async fn execute(&self, ctx: &WorkerContext) -> Result<serde_json::Value, EngineError> {
        match &self.mode {
            ScriptedMode::Succeed(value) => Ok(value.clone()),
            ScriptedMode::Fail(reason) => Err(EngineError::Execution(reason.clone())),
            ScriptedMode::Panic(reason) => panic!("{reason}"),
            ScriptedMode::RejectValidation(_) => Ok(serde_json::Value::Null),
            ScriptedMode::WaitForCancel => {
                loop {
                    ctx.checkpoint()?;
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
        }
    }
}
