// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared world-building for the scenario tests.

use quaero_adapters::fakes::{
    FakeAgentClient, FakeDocumentStore, FakeFetcher, FakePlacesClient, FakeSearchIndex,
};
use quaero_core::{Job, JobId, JobStatus, SharedClock};
use quaero_definition::{DefinitionSet, JobDefinition};
use quaero_engine::{AdapterSet, Runtime, RuntimeConfig, VariableStore};
use std::sync::Arc;
use std::time::Duration;

pub struct World {
    pub runtime: Arc<Runtime>,
    pub documents: Arc<FakeDocumentStore>,
    pub fetcher: Arc<FakeFetcher>,
    pub agents: Arc<FakeAgentClient>,
    _dir: tempfile::TempDir,
}

pub struct WorldConfig {
    pub visibility_timeout: Duration,
    pub concurrency: u32,
    pub start: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(60),
            concurrency: 5,
            start: true,
        }
    }
}

pub fn definitions(toml_sources: &[&str]) -> DefinitionSet {
    let mut set = DefinitionSet::default();
    for source in toml_sources {
        set.insert(JobDefinition::parse(source).expect("test definition parses"));
    }
    set
}

pub async fn world(defs: DefinitionSet, config: WorldConfig) -> World {
    let dir = tempfile::tempdir().expect("tempdir");
    let documents = Arc::new(FakeDocumentStore::new());
    let fetcher = Arc::new(FakeFetcher::new());
    let agents = Arc::new(FakeAgentClient::new());
    let adapters = AdapterSet {
        documents: Arc::clone(&documents) as _,
        fetcher: Arc::clone(&fetcher) as _,
        agents: Arc::clone(&agents) as _,
        index: Arc::new(FakeSearchIndex::with_documents(0)),
        places: Arc::new(FakePlacesClient::new()),
    };

    let mut runtime_config = RuntimeConfig::new(dir.path().join("state"));
    runtime_config.concurrency = config.concurrency;
    runtime_config.visibility_timeout = config.visibility_timeout;
    runtime_config.receive_poll_interval = Duration::from_millis(10);
    runtime_config.monitor_interval = Duration::from_millis(25);
    runtime_config.orchestrator_poll_interval = Duration::from_millis(25);
    runtime_config.stats_interval = Duration::from_millis(50);

    let runtime = Arc::new(
        Runtime::open(
            runtime_config,
            SharedClock::system(),
            adapters,
            defs,
            VariableStore::new(),
        )
        .expect("runtime opens"),
    );
    if config.start {
        runtime.start();
    }
    World {
        runtime,
        documents,
        fetcher,
        agents,
        _dir: dir,
    }
}

/// Poll until the job reaches a terminal status (5s budget).
pub async fn wait_terminal(world: &World, id: &JobId) -> Job {
    for _ in 0..250 {
        if let Some(job) = world.runtime.jobs().get(id) {
            if job.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {id} never reached a terminal status");
}

/// Poll until the queue is fully drained.
pub async fn wait_queue_empty(world: &World) {
    for _ in 0..250 {
        if world.runtime.queue_stats().total == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("queue never drained");
}

/// The children of the step parent at `step_index` under `root`.
pub fn step_children(world: &World, root: &JobId, step_index: usize) -> Vec<Job> {
    let step_parent = world
        .runtime
        .jobs()
        .list_children(root)
        .into_iter()
        .find(|job| job.step_index == Some(step_index))
        .expect("step parent exists");
    world.runtime.jobs().list_children(&step_parent.id)
}

pub fn step_parent(world: &World, root: &JobId, step_index: usize) -> Job {
    world
        .runtime
        .jobs()
        .list_children(root)
        .into_iter()
        .find(|job| job.step_index == Some(step_index))
        .expect("step parent exists")
}

pub fn count_status(jobs: &[Job], status: JobStatus) -> usize {
    jobs.iter().filter(|j| j.status == status).count()
}
