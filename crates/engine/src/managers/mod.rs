// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step managers: per-action orchestration adapters.
//!
//! A manager turns one definition step into a step-parent job plus child
//! messages (crawl, agent, database_maintenance), or performs the work
//! inline and returns an already-terminal parent (transform, reindex,
//! places_search). Failures inside a manager fail the step parent rather
//! than bubbling out, so the orchestrator always has a record to observe.

mod agent;
mod crawl;
mod maintenance;
mod places;
mod reindex;
mod transform;

pub use agent::AgentManager;
pub use crawl::CrawlManager;
pub use maintenance::MaintenanceManager;
pub use places::PlacesSearchManager;
pub use reindex::ReindexManager;
pub use transform::TransformManager;

use crate::error::EngineError;
use crate::services::Services;
use async_trait::async_trait;
use quaero_core::{Job, JobId, JobSeed, JobStatus};
use quaero_definition::{JobDefinition, StepDef};

/// Orchestration adapter for one step action tag.
#[async_trait]
pub trait Manager: Send + Sync + 'static {
    /// The step action this manager serves, e.g. `"crawl"`.
    fn manager_type(&self) -> &str;

    /// Create the step-parent job under `root_id`, compute the work set,
    /// and enqueue one child per work item (or do the work inline).
    /// Returns the step parent's id.
    async fn create_parent_job(
        &self,
        step: &StepDef,
        definition: &JobDefinition,
        root_id: &JobId,
        step_index: usize,
    ) -> Result<JobId, EngineError>;
}

/// Shared first move of every manager: a running step parent carrying the
/// definition's tolerance.
///
/// A running `step_index` parent is visible to the monitor from this
/// point on, so both transitions here and in [`complete_parent`] must
/// tolerate the monitor (or a cancel) getting there first.
pub(crate) fn create_step_parent(
    services: &Services,
    step: &StepDef,
    definition: &JobDefinition,
    root_id: &JobId,
    step_index: usize,
) -> Result<Job, EngineError> {
    let seed = JobSeed::new(step.name.clone(), step.action.clone())
        .parent(root_id.clone())
        .definition(definition.id.clone())
        .step_index(step_index)
        .tolerance(definition.error_tolerance)
        .payload(step.config.clone());
    let created = services.jobs.create_job(seed)?;
    let job = match services.transition_if_live(&created.id, JobStatus::Running)? {
        Some(job) => job,
        None => services.jobs.get(&created.id).unwrap_or(created),
    };
    tracing::info!(
        job_id = %job.id,
        action = %step.action,
        step = %step.name,
        "step parent created"
    );
    Ok(job)
}

/// Close a synchronous manager's parent with a result.
///
/// The monitor closes childless running parents on its tick, so a slow
/// adapter call can lose the completion race; the result still lands and
/// the terminal status is left alone.
pub(crate) fn complete_parent(
    services: &Services,
    parent: &JobId,
    result: serde_json::Value,
) -> Result<(), EngineError> {
    services.jobs.set_result(parent, result)?;
    if services
        .transition_if_live(parent, JobStatus::Completed)?
        .is_none()
    {
        tracing::debug!(job_id = %parent, "step parent already closed, keeping its terminal status");
    }
    Ok(())
}

/// Fail a manager's parent in place, keeping the error observable.
pub(crate) fn fail_parent(services: &Services, parent: &JobId, error: &EngineError) {
    tracing::warn!(job_id = %parent, error = %error, "manager failed its step parent");
    if let Err(e) = services.fail(parent, error.to_string()) {
        tracing::error!(job_id = %parent, error = %e, "unable to record step parent failure");
    }
}

#[cfg(test)]
#[path = "managers_tests.rs"]
mod tests;
