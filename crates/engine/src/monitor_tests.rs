// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::harness;
use quaero_core::{ErrorTolerance, Event, FailureAction, JobSeed};

/// Running step parent (step_index set, optional tolerance).
fn step_parent(
    services: &Services,
    tolerance: Option<ErrorTolerance>,
) -> quaero_core::JobId {
    let mut seed = JobSeed::new("step parent", "crawl").step_index(0);
    if let Some(t) = tolerance {
        seed = seed.tolerance(t);
    }
    let root = services
        .jobs
        .create_parent_job(JobSeed::new("root", "definition_run"))
        .unwrap();
    let parent = services.jobs.create_child_job(&root.id, seed).unwrap();
    services
        .transition(&parent.id, JobStatus::Running)
        .unwrap()
        .id
}

fn child(services: &Services, parent: &quaero_core::JobId, status: JobStatus) -> quaero_core::JobId {
    let job = services
        .jobs
        .create_child_job(parent, JobSeed::new("child", "t"))
        .unwrap();
    match status {
        JobStatus::Pending => {}
        JobStatus::Running => {
            services.transition(&job.id, JobStatus::Running).unwrap();
        }
        JobStatus::Failed => {
            services.transition(&job.id, JobStatus::Running).unwrap();
            services.fail(&job.id, "scripted failure").unwrap();
        }
        terminal => {
            services.transition(&job.id, JobStatus::Running).unwrap();
            services.transition(&job.id, terminal).unwrap();
        }
    }
    job.id
}

#[tokio::test]
async fn progress_tracks_terminal_children() {
    let h = harness();
    let parent = step_parent(&h.services, None);
    child(&h.services, &parent, JobStatus::Completed);
    child(&h.services, &parent, JobStatus::Cancelled);
    child(&h.services, &parent, JobStatus::Running);
    child(&h.services, &parent, JobStatus::Pending);

    let monitor = ParentMonitor::new(h.services.clone(), MonitorConfig::default());
    monitor.tick().unwrap();

    let updated = h.services.jobs.get(&parent).unwrap();
    // Cancelled counts as done
    assert_eq!(updated.progress_current, 2);
    assert_eq!(updated.progress_total, 4);
    assert_eq!(updated.status, JobStatus::Running);
}

#[tokio::test]
async fn parent_completes_when_all_children_terminal() {
    let h = harness();
    let parent = step_parent(&h.services, None);
    child(&h.services, &parent, JobStatus::Completed);
    child(&h.services, &parent, JobStatus::Completed);
    let mut events = h.services.bus.subscribe();

    let monitor = ParentMonitor::new(h.services.clone(), MonitorConfig::default());
    monitor.tick().unwrap();

    let closed = h.services.jobs.get(&parent).unwrap();
    assert_eq!(closed.status, JobStatus::Completed);
    assert_eq!(closed.result.unwrap()["completed"], serde_json::json!(2));

    let mut saw_terminal = false;
    while let Ok(event) = events.try_recv() {
        if let Event::StatusChanged { new: JobStatus::Completed, .. } = event {
            saw_terminal = true;
        }
    }
    assert!(saw_terminal);
}

#[tokio::test]
async fn failures_without_breach_still_complete_parent() {
    let h = harness();
    // max 0 = unlimited failures allowed
    let parent = step_parent(
        &h.services,
        Some(ErrorTolerance {
            max_child_failures: 0,
            failure_action: FailureAction::StopAll,
        }),
    );
    child(&h.services, &parent, JobStatus::Failed);
    child(&h.services, &parent, JobStatus::Completed);

    let monitor = ParentMonitor::new(h.services.clone(), MonitorConfig::default());
    monitor.tick().unwrap();

    assert_eq!(
        h.services.jobs.get(&parent).unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn breached_tolerance_fails_parent() {
    let h = harness();
    let parent = step_parent(
        &h.services,
        Some(ErrorTolerance {
            max_child_failures: 1,
            failure_action: FailureAction::StopAll,
        }),
    );
    child(&h.services, &parent, JobStatus::Failed);
    child(&h.services, &parent, JobStatus::Failed);
    child(&h.services, &parent, JobStatus::Completed);

    let monitor = ParentMonitor::new(h.services.clone(), MonitorConfig::default());
    monitor.tick().unwrap();

    let closed = h.services.jobs.get(&parent).unwrap();
    assert_eq!(closed.status, JobStatus::Failed);
    assert!(closed.error.unwrap().contains("2 of 3 children failed"));
}

#[tokio::test]
async fn mark_warning_breach_completes_with_flag() {
    let h = harness();
    let parent = step_parent(
        &h.services,
        Some(ErrorTolerance {
            max_child_failures: 1,
            failure_action: FailureAction::MarkWarning,
        }),
    );
    child(&h.services, &parent, JobStatus::Failed);
    child(&h.services, &parent, JobStatus::Failed);
    child(&h.services, &parent, JobStatus::Completed);

    let monitor = ParentMonitor::new(h.services.clone(), MonitorConfig::default());
    monitor.tick().unwrap();

    let closed = h.services.jobs.get(&parent).unwrap();
    assert_eq!(closed.status, JobStatus::Completed);
    assert!(closed.warning);
}

#[tokio::test]
async fn childless_parent_closes_on_first_tick() {
    let h = harness();
    let parent = step_parent(&h.services, None);

    let monitor = ParentMonitor::new(h.services.clone(), MonitorConfig::default());
    monitor.tick().unwrap();

    assert_eq!(
        h.services.jobs.get(&parent).unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn roots_are_left_to_the_orchestrator() {
    let h = harness();
    let root = h
        .services
        .jobs
        .create_parent_job(JobSeed::new("root", "definition_run"))
        .unwrap();
    h.services.transition(&root.id, JobStatus::Running).unwrap();

    let monitor = ParentMonitor::new(h.services.clone(), MonitorConfig::default());
    monitor.tick().unwrap();

    // No step_index: untouched even though it has no children
    assert_eq!(
        h.services.jobs.get(&root.id).unwrap().status,
        JobStatus::Running
    );
}

#[tokio::test]
async fn started_loop_closes_parents() {
    let h = harness();
    let parent = step_parent(&h.services, None);
    child(&h.services, &parent, JobStatus::Completed);

    let monitor = ParentMonitor::new(
        h.services.clone(),
        MonitorConfig {
            interval: Duration::from_millis(10),
        },
    );
    monitor.start();
    for _ in 0..100 {
        if h.services.jobs.get(&parent).unwrap().is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    monitor.stop().await;

    assert_eq!(
        h.services.jobs.get(&parent).unwrap().status,
        JobStatus::Completed
    );
}
