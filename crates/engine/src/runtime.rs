// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine assembly: stores + registries + background loops in one handle.
//!
//! The daemon builds exactly one `Runtime` with production adapters;
//! integration tests build one with fakes. Either way the wiring is the
//! same: default workers and managers registered, pool/monitor/stats
//! loops started on demand.

use crate::bus::EventBus;
use crate::error::EngineError;
use crate::managers::{
    AgentManager, CrawlManager, MaintenanceManager, PlacesSearchManager, ReindexManager,
    TransformManager,
};
use crate::monitor::{MonitorConfig, ParentMonitor};
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::pool::{PoolConfig, WorkerPool};
use crate::queue::QueueManager;
use crate::registry::{ManagerRegistry, WorkerRegistry};
use crate::services::{Jobs, Services};
use crate::stats::StatsBroadcaster;
use crate::vars::VariableStore;
use crate::workers::{AgentWorker, CrawlerWorker, MaintenanceWorker};
use quaero_adapters::{AgentClient, DocumentStore, PageFetcher, PlacesClient, SearchIndex};
use quaero_core::{Job, JobId, JobSeed, QueueStats, SharedClock};
use quaero_definition::{DefinitionSet, JobDefinition};
use quaero_storage::{JobStore, QueueStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub state_dir: PathBuf,
    pub concurrency: u32,
    pub visibility_timeout: Duration,
    pub receive_poll_interval: Duration,
    pub monitor_interval: Duration,
    pub orchestrator_poll_interval: Duration,
    pub stats_interval: Duration,
    pub shutdown_grace: Duration,
}

impl RuntimeConfig {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            concurrency: 5,
            visibility_timeout: Duration::from_secs(300),
            receive_poll_interval: Duration::from_millis(100),
            monitor_interval: Duration::from_secs(1),
            orchestrator_poll_interval: Duration::from_millis(250),
            stats_interval: crate::stats::STATS_INTERVAL,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Production collaborators, one per concern.
#[derive(Clone)]
pub struct AdapterSet {
    pub documents: Arc<dyn DocumentStore>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub agents: Arc<dyn AgentClient>,
    pub index: Arc<dyn SearchIndex>,
    pub places: Arc<dyn PlacesClient>,
}

pub struct Runtime {
    services: Services,
    definitions: parking_lot::RwLock<DefinitionSet>,
    orchestrator: Orchestrator,
    pool: WorkerPool,
    monitor: ParentMonitor,
    stats: StatsBroadcaster,
    vars: VariableStore,
    cancel: CancellationToken,
    concurrency: u32,
}

impl Runtime {
    /// Open stores under `config.state_dir` and wire the default workers
    /// and managers.
    pub fn open(
        config: RuntimeConfig,
        clock: SharedClock,
        adapters: AdapterSet,
        definitions: DefinitionSet,
        vars: VariableStore,
    ) -> Result<Self, EngineError> {
        let jobs: Jobs = JobStore::open(&config.state_dir, clock.clone())?;
        let queue_store = QueueStore::open(&config.state_dir, "jobs")?;
        let queue = QueueManager::new(
            queue_store,
            clock.clone(),
            config.visibility_timeout,
            config.receive_poll_interval,
        );
        let bus = EventBus::new();
        let services = Services {
            jobs,
            queue: queue.clone(),
            bus: bus.clone(),
            clock: clock.clone(),
        };

        let mut workers = WorkerRegistry::new();
        workers.register(Arc::new(CrawlerWorker::new(
            Arc::clone(&adapters.fetcher),
            Arc::clone(&adapters.documents),
        )));
        workers.register(Arc::new(AgentWorker::new(
            Arc::clone(&adapters.documents),
            Arc::clone(&adapters.agents),
        )));
        workers.register(Arc::new(MaintenanceWorker::new(
            Arc::clone(&adapters.documents),
            Arc::clone(&adapters.index),
        )));

        let mut managers = ManagerRegistry::new();
        managers.register(Arc::new(CrawlManager::new(services.clone())));
        managers.register(Arc::new(AgentManager::new(
            services.clone(),
            Arc::clone(&adapters.documents),
        )));
        managers.register(Arc::new(MaintenanceManager::new(services.clone())));
        managers.register(Arc::new(TransformManager::new(
            services.clone(),
            Arc::clone(&adapters.documents),
        )));
        managers.register(Arc::new(ReindexManager::new(
            services.clone(),
            Arc::clone(&adapters.index),
        )));
        managers.register(Arc::new(PlacesSearchManager::new(
            services.clone(),
            Arc::clone(&adapters.places),
            Arc::clone(&adapters.documents),
        )));

        let orchestrator = Orchestrator::new(
            services.clone(),
            Arc::new(managers),
            vars.clone(),
            OrchestratorConfig {
                poll_interval: config.orchestrator_poll_interval,
            },
        );
        let pool = WorkerPool::new(
            services.clone(),
            Arc::new(workers),
            PoolConfig {
                concurrency: config.concurrency,
                shutdown_grace: config.shutdown_grace,
            },
        );
        let monitor = ParentMonitor::new(
            services.clone(),
            MonitorConfig {
                interval: config.monitor_interval,
            },
        );
        let stats = StatsBroadcaster::new(
            queue,
            bus,
            clock,
            config.concurrency,
            config.stats_interval,
        );

        Ok(Self {
            services,
            definitions: parking_lot::RwLock::new(definitions),
            orchestrator,
            pool,
            monitor,
            stats,
            vars,
            cancel: CancellationToken::new(),
            concurrency: config.concurrency,
        })
    }

    /// Start the pool, monitor, and stats loops.
    pub fn start(&self) {
        self.pool.start();
        self.monitor.start();
        self.stats.start();
    }

    /// Stop everything: loops drain up to the pool's grace, then the
    /// queue's visibility discipline takes over.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.stats.stop().await;
        self.monitor.stop().await;
        self.pool.stop().await;
        if let Err(e) = self.services.jobs.flush() {
            tracing::warn!(error = %e, "job store flush on shutdown failed");
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn jobs(&self) -> &Jobs {
        &self.services.jobs
    }

    pub fn bus(&self) -> &EventBus {
        &self.services.bus
    }

    pub fn vars(&self) -> &VariableStore {
        &self.vars
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.services.queue.stats(self.concurrency)
    }

    pub fn definition_auto_starts(&self, id: &str) -> bool {
        self.definitions
            .read()
            .get(id)
            .map(|d| d.enabled && d.auto_start)
            .unwrap_or(false)
    }

    pub fn definition_ids(&self) -> Vec<String> {
        self.definitions
            .read()
            .iter()
            .map(|d| d.id.clone())
            .collect()
    }

    /// Trigger a definition run. Returns the queued root immediately; the
    /// pre-jobs, steps, and post-jobs execute on a background task.
    pub fn execute(&self, definition_id: &str) -> Result<Job, EngineError> {
        let (definition, root, pre, post) = self.prepare_chain(definition_id)?;
        let orchestrator = self.orchestrator.clone();
        let root_id = root.id.clone();
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            run_chain(orchestrator, pre, definition, root_id, post, cancel).await;
        });
        Ok(root)
    }

    /// Run a definition (with its pre/post chain) to completion.
    pub async fn execute_and_wait(&self, definition_id: &str) -> Result<Job, EngineError> {
        let (definition, root, pre, post) = self.prepare_chain(definition_id)?;
        run_chain(
            self.orchestrator.clone(),
            pre,
            definition,
            root.id.clone(),
            post,
            self.cancel.child_token(),
        )
        .await;
        self.services
            .jobs
            .get(&root.id)
            .ok_or_else(|| EngineError::Execution(format!("root job vanished: {}", root.id)))
    }

    #[allow(clippy::type_complexity)]
    fn prepare_chain(
        &self,
        definition_id: &str,
    ) -> Result<(JobDefinition, Job, Vec<JobDefinition>, Vec<JobDefinition>), EngineError> {
        let definitions = self.definitions.read();
        let definition = definitions.require(definition_id)?.clone();
        if !definition.enabled {
            return Err(EngineError::Validation(format!(
                "definition '{definition_id}' is disabled"
            )));
        }
        let resolve = |ids: &[String]| -> Vec<JobDefinition> {
            ids.iter()
                .filter_map(|id| match definitions.get(id) {
                    Some(chained) if chained.enabled => Some(chained.clone()),
                    Some(_) => {
                        tracing::warn!(definition = %id, "chained definition is disabled, skipping");
                        None
                    }
                    None => {
                        tracing::warn!(definition = %id, "chained definition not found, skipping");
                        None
                    }
                })
                .collect()
        };
        let pre = resolve(&definition.pre_jobs);
        let post = resolve(&definition.post_jobs);
        drop(definitions);
        let root = self.orchestrator.prepare_root(&definition)?;
        Ok((definition, root, pre, post))
    }

    /// Cancel a job and its whole subtree.
    pub fn cancel_job(&self, id: &JobId) -> Result<usize, EngineError> {
        self.services.cancel_tree(id)
    }

    /// Copy a job: fresh id, no parent, pending, same payload.
    pub fn copy_job(&self, id: &JobId) -> Result<Job, EngineError> {
        let source = self
            .services
            .jobs
            .get(id)
            .ok_or_else(|| EngineError::Execution(format!("job not found: {id}")))?;
        let mut seed = JobSeed::new(format!("{} (copy)", source.name), source.job_type.clone())
            .payload(source.payload.clone());
        if let Some(definition_id) = source.definition_id {
            seed = seed.definition(definition_id);
        }
        if let Some(tolerance) = source.tolerance {
            seed = seed.tolerance(tolerance);
        }
        Ok(self.services.jobs.create_parent_job(seed)?)
    }

    /// Administrative delete; cascades to descendants.
    pub fn delete_job(&self, id: &JobId) -> Result<(), EngineError> {
        self.services.jobs.delete_job(id)?;
        Ok(())
    }
}

/// Pre-jobs, then the main definition, then post-jobs. Each chained
/// definition gets its own root record; a failed pre/post run is logged
/// and does not sink the main run (the main run's own steps decide its
/// outcome).
async fn run_chain(
    orchestrator: Orchestrator,
    pre: Vec<JobDefinition>,
    main: JobDefinition,
    main_root: JobId,
    post: Vec<JobDefinition>,
    cancel: CancellationToken,
) {
    for definition in pre {
        run_chained(&orchestrator, &definition, &cancel).await;
    }
    if let Err(e) = orchestrator.run(&main_root, &main, cancel.child_token()).await {
        tracing::error!(job_id = %main_root, error = %e, "definition run failed");
    }
    for definition in post {
        run_chained(&orchestrator, &definition, &cancel).await;
    }
}

async fn run_chained(
    orchestrator: &Orchestrator,
    definition: &JobDefinition,
    cancel: &CancellationToken,
) {
    let root = match orchestrator.prepare_root(definition) {
        Ok(root) => root,
        Err(e) => {
            tracing::warn!(definition = %definition.id, error = %e, "chained run not created");
            return;
        }
    };
    if let Err(e) = orchestrator.run(&root.id, definition, cancel.child_token()).await {
        tracing::warn!(definition = %definition.id, job_id = %root.id, error = %e, "chained run failed");
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
