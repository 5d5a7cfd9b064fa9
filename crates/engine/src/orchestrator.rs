// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job orchestrator: sequential execution of a definition's steps.
//!
//! One run owns one root parent. Each step is routed to its manager,
//! which produces a step parent; the orchestrator then polls the step
//! parent's tree until terminal, applying the definition's error
//! tolerance and timeout along the way. Step order is strict; children
//! within a step complete in any order.

use crate::error::EngineError;
use crate::registry::ManagerRegistry;
use crate::services::Services;
use crate::vars::VariableStore;
use quaero_core::{Clock, FailureAction, Job, JobId, JobSeed, JobStatus, LogLevel};
use quaero_definition::{ErrorPolicy, JobDefinition, StepDef};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How often a step parent's tree is re-inspected.
    pub poll_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Observed end state of one step.
struct StepRun {
    parent_id: Option<JobId>,
    status: JobStatus,
    warning: bool,
    error: Option<String>,
}

#[derive(Clone)]
pub struct Orchestrator {
    services: Services,
    managers: Arc<ManagerRegistry>,
    vars: VariableStore,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        services: Services,
        managers: Arc<ManagerRegistry>,
        vars: VariableStore,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            services,
            managers,
            vars,
            config,
        }
    }

    /// Create the root parent for a definition run (pending, progress
    /// 0 / number-of-steps).
    pub fn prepare_root(&self, definition: &JobDefinition) -> Result<Job, EngineError> {
        let seed = JobSeed::new(definition.name.clone(), "definition_run")
            .definition(definition.id.clone())
            .tolerance(definition.error_tolerance)
            .payload(serde_json::json!({ "definition_id": definition.id }));
        let root = self.services.jobs.create_parent_job(seed)?;
        self.services
            .jobs
            .update_progress(&root.id, 0, definition.steps.len() as u64)?;
        tracing::info!(job_id = %root.id, definition = %definition.id, "definition run created");
        Ok(root)
    }

    /// Run the definition's steps against an existing root.
    pub async fn run(
        &self,
        root_id: &JobId,
        definition: &JobDefinition,
        cancel: CancellationToken,
    ) -> Result<Job, EngineError> {
        match self.run_inner(root_id, definition, cancel).await {
            Ok(job) => Ok(job),
            Err(e) => {
                tracing::error!(job_id = %root_id, error = %e, "definition run aborted");
                if let Err(record) = self.services.fail(root_id, format!("orchestration error: {e}")) {
                    tracing::debug!(job_id = %root_id, error = %record, "root already terminal");
                }
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        root_id: &JobId,
        definition: &JobDefinition,
        cancel: CancellationToken,
    ) -> Result<Job, EngineError> {
        let resolved = definition.resolve(&self.vars.snapshot());
        self.services.transition(root_id, JobStatus::Running)?;

        let step_timeout = resolved.timeout_duration();
        let total_steps = resolved.steps.len() as u64;
        let mut reports = Vec::new();
        let mut warned = false;

        for (index, step) in resolved.steps.iter().enumerate() {
            if cancel.is_cancelled() || self.root_cancelled(root_id) {
                return self.finish_cancelled(root_id);
            }

            let run = self
                .run_step_with_policy(root_id, &resolved, step, index, step_timeout, &cancel)
                .await?;
            warned |= run.warning;

            reports.push(serde_json::json!({
                "step": step.name,
                "action": step.action,
                "job_id": run.parent_id.as_ref().map(ToString::to_string),
                "status": run.status,
                "error": run.error.clone(),
            }));
            self.services.log(
                root_id,
                if run.status == JobStatus::Completed {
                    LogLevel::Info
                } else {
                    LogLevel::Warn
                },
                format!("step '{}' finished: {}", step.name, run.status),
            )?;

            match run.status {
                JobStatus::Cancelled => return self.finish_cancelled(root_id),
                JobStatus::Failed if step.on_error == ErrorPolicy::Continue => {
                    tracing::info!(job_id = %root_id, step = %step.name, "step failed, on_error=continue");
                }
                JobStatus::Failed => {
                    let reason = run
                        .error
                        .unwrap_or_else(|| format!("step '{}' failed", step.name));
                    self.services.jobs.set_result(
                        root_id,
                        serde_json::json!({ "steps": reports }),
                    )?;
                    self.services.fail(root_id, reason)?;
                    return self.current(root_id);
                }
                _ => {}
            }

            if let Err(e) = self
                .services
                .progress(root_id, (index + 1) as u64, total_steps)
            {
                // A concurrent cancel can close the root between steps
                tracing::debug!(job_id = %root_id, error = %e, "root progress update lost a race");
            }
        }

        self.services
            .jobs
            .set_result(root_id, serde_json::json!({ "steps": reports }))?;
        if warned {
            self.services.jobs.set_warning(root_id)?;
        }
        if self.services.transition_if_live(root_id, JobStatus::Completed)?.is_none() {
            tracing::debug!(job_id = %root_id, "root closed elsewhere before completion");
        }
        self.current(root_id)
    }

    /// Run one step, honoring its `on_error = retry` policy (one re-run,
    /// then the failure stands).
    async fn run_step_with_policy(
        &self,
        root_id: &JobId,
        definition: &JobDefinition,
        step: &StepDef,
        index: usize,
        step_timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<StepRun, EngineError> {
        let attempts = if step.on_error == ErrorPolicy::Retry { 2 } else { 1 };
        let mut last = self
            .run_step_once(root_id, definition, step, index, step_timeout, cancel)
            .await?;
        for _ in 1..attempts {
            if last.status != JobStatus::Failed {
                break;
            }
            tracing::info!(job_id = %root_id, step = %step.name, "retrying failed step (on_error=retry)");
            self.services
                .log(root_id, LogLevel::Warn, format!("retrying step '{}'", step.name))?;
            last = self
                .run_step_once(root_id, definition, step, index, step_timeout, cancel)
                .await?;
        }
        Ok(last)
    }

    async fn run_step_once(
        &self,
        root_id: &JobId,
        definition: &JobDefinition,
        step: &StepDef,
        index: usize,
        step_timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<StepRun, EngineError> {
        let Some(manager) = self.managers.get(&step.action) else {
            return Ok(StepRun {
                parent_id: None,
                status: JobStatus::Failed,
                warning: false,
                error: Some(EngineError::NoManager(step.action.clone()).to_string()),
            });
        };

        let step_parent = manager
            .create_parent_job(step, definition, root_id, index)
            .await?;
        let deadline_ms = step_timeout.map(|t| self.services.clock.epoch_ms() + t.as_millis() as u64);

        loop {
            let Some(parent) = self.services.jobs.get(&step_parent) else {
                return Ok(StepRun {
                    parent_id: Some(step_parent),
                    status: JobStatus::Failed,
                    warning: false,
                    error: Some("step parent deleted mid-run".to_string()),
                });
            };
            if parent.is_terminal() {
                return Ok(StepRun {
                    parent_id: Some(parent.id.clone()),
                    status: parent.status,
                    warning: parent.warning,
                    error: parent.error,
                });
            }

            // Tolerance check between polls
            let failed = self.services.jobs.count_failed_children(&step_parent);
            let tolerance = definition.error_tolerance;
            if tolerance.is_breached(failed) {
                match tolerance.failure_action {
                    FailureAction::StopAll => {
                        let cancelled = self.cancel_live_children(&step_parent)?;
                        tracing::info!(
                            job_id = %step_parent,
                            failed,
                            cancelled,
                            "tolerance breached, stopping step"
                        );
                        self.services.fail(
                            &step_parent,
                            format!("error tolerance breached: {failed} children failed"),
                        )?;
                        return Ok(StepRun {
                            parent_id: Some(step_parent),
                            status: JobStatus::Failed,
                            warning: false,
                            error: Some(format!("error tolerance breached: {failed} children failed")),
                        });
                    }
                    FailureAction::Continue => {}
                    FailureAction::MarkWarning => {
                        if !parent.warning {
                            self.services.jobs.set_warning(&step_parent)?;
                            self.services.log(
                                &step_parent,
                                LogLevel::Warn,
                                format!("error tolerance breached ({failed} failures), marking warning"),
                            )?;
                        }
                    }
                }
            }

            // Definition timeout bounds each step
            if let Some(deadline) = deadline_ms {
                if self.services.clock.epoch_ms() >= deadline {
                    self.cancel_live_children(&step_parent)?;
                    self.services
                        .fail(&step_parent, format!("step '{}' timed out", step.name))?;
                    return Ok(StepRun {
                        parent_id: Some(step_parent),
                        status: JobStatus::Failed,
                        warning: false,
                        error: Some(format!("step '{}' timed out", step.name)),
                    });
                }
            }

            if cancel.is_cancelled() || self.root_cancelled(root_id) {
                return Ok(StepRun {
                    parent_id: Some(step_parent),
                    status: JobStatus::Cancelled,
                    warning: false,
                    error: None,
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Cancel the non-terminal children of a step parent. Their queue
    /// messages are left to expire; workers short-circuit terminal jobs.
    fn cancel_live_children(&self, step_parent: &JobId) -> Result<usize, EngineError> {
        let mut cancelled = 0;
        for child in self.services.jobs.list_children(step_parent) {
            if child.is_terminal() {
                continue;
            }
            if self
                .services
                .transition_if_live(&child.id, JobStatus::Cancelled)?
                .is_some()
            {
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    fn root_cancelled(&self, root_id: &JobId) -> bool {
        self.services
            .jobs
            .get(root_id)
            .map(|job| job.status == JobStatus::Cancelled)
            .unwrap_or(true)
    }

    /// Make sure the whole tree is cancelled, then report the root.
    fn finish_cancelled(&self, root_id: &JobId) -> Result<Job, EngineError> {
        let cancelled = self.services.cancel_tree(root_id)?;
        tracing::info!(job_id = %root_id, cancelled, "definition run cancelled");
        self.current(root_id)
    }

    fn current(&self, root_id: &JobId) -> Result<Job, EngineError> {
        self.services
            .jobs
            .get(root_id)
            .ok_or_else(|| EngineError::Execution(format!("root job vanished: {root_id}")))
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
