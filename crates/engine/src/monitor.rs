// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parent job monitor.
//!
//! Aggregates child status into step parents so workers never touch their
//! parent's record. A shared poller walks every running step parent,
//! refreshes its progress from the tree aggregate, and closes it once all
//! children are terminal — failed when the tolerance was breached,
//! completed otherwise. A parent that spawned no children closes on its
//! first tick.

use crate::error::EngineError;
use crate::services::Services;
use quaero_core::{Job, JobStatus, TreeStatus};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

pub struct ParentMonitor {
    services: Services,
    config: MonitorConfig,
    cancel: CancellationToken,
    handle: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ParentMonitor {
    pub fn new(services: Services, config: MonitorConfig) -> Self {
        Self {
            services,
            config,
            cancel: CancellationToken::new(),
            handle: parking_lot::Mutex::new(None),
        }
    }

    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            tracing::warn!("parent monitor already started");
            return;
        }
        let services = self.services.clone();
        let interval = self.config.interval;
        let cancel = self.cancel.clone();
        *handle = Some(tokio::spawn(async move {
            tracing::debug!(?interval, "parent monitor started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                if let Err(e) = tick(&services) {
                    tracing::warn!(error = %e, "monitor tick failed");
                }
            }
            tracing::debug!("parent monitor stopped");
        }));
    }

    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.await;
        }
    }

    /// One aggregation pass. Exposed so tests can drive the monitor
    /// without waiting on wall-clock ticks.
    pub fn tick(&self) -> Result<(), EngineError> {
        tick(&self.services)
    }
}

fn tick(services: &Services) -> Result<(), EngineError> {
    let parents: Vec<Job> = services
        .jobs
        .list_running()
        .into_iter()
        // Step parents only; roots are the orchestrator's to close
        .filter(|job| job.step_index.is_some())
        .collect();

    for parent in parents {
        let tree = match services.jobs.tree_status(&parent.id) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::debug!(job_id = %parent.id, error = %e, "parent vanished mid-tick");
                continue;
            }
        };
        let done = tree.counts.terminal();
        if done != parent.progress_current || tree.total_children != parent.progress_total {
            if let Err(e) = services.progress(&parent.id, done, tree.total_children) {
                tracing::debug!(job_id = %parent.id, error = %e, "parent progress update lost a race");
                continue;
            }
        }
        if tree.all_terminal() {
            close_parent(services, &parent, &tree)?;
        }
    }
    Ok(())
}

fn close_parent(services: &Services, parent: &Job, tree: &TreeStatus) -> Result<(), EngineError> {
    let failed = tree.counts.failed;
    match parent.tolerance {
        Some(tolerance) if tolerance.is_breached(failed) => match tolerance.failure_action {
            quaero_core::FailureAction::StopAll => {
                tracing::info!(job_id = %parent.id, failed, "closing parent as failed (tolerance breached)");
                services.fail(
                    &parent.id,
                    format!("{failed} of {} children failed", tree.total_children),
                )?;
                return Ok(());
            }
            quaero_core::FailureAction::Continue => {}
            quaero_core::FailureAction::MarkWarning => {
                services.jobs.set_warning(&parent.id)?;
            }
        },
        _ => {}
    }

    services.jobs.set_result(
        &parent.id,
        serde_json::json!({
            "children": tree.total_children,
            "completed": tree.counts.completed,
            "failed": failed,
            "cancelled": tree.counts.cancelled,
        }),
    )?;
    match services.transition_if_live(&parent.id, JobStatus::Completed)? {
        Some(_) => {
            tracing::info!(job_id = %parent.id, children = tree.total_children, "parent completed");
        }
        None => {
            tracing::debug!(job_id = %parent.id, "parent already closed elsewhere");
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
