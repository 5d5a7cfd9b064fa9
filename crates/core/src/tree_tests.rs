// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn counts(pending: u64, running: u64, completed: u64, failed: u64, cancelled: u64) -> StatusCounts {
    StatusCounts {
        pending,
        running,
        completed,
        failed,
        cancelled,
    }
}

#[test]
fn empty_tree_reads_fully_progressed() {
    let tree = TreeStatus::compute(StatusCounts::default(), Some(0), 10);
    assert_eq!(tree.total_children, 0);
    assert!(tree.all_terminal());
    assert_eq!(tree.overall_progress, 1.0);
}

#[test]
fn progress_counts_cancelled_as_done() {
    let tree = TreeStatus::compute(counts(0, 0, 2, 1, 1), Some(0), 100);
    assert_eq!(tree.total_children, 4);
    assert!(tree.all_terminal());
    assert_eq!(tree.overall_progress, 1.0);
    assert_eq!(tree.eta_ms, Some(0));
}

#[test]
fn partial_progress_fraction() {
    let tree = TreeStatus::compute(counts(2, 1, 1, 0, 0), Some(0), 100);
    assert_eq!(tree.total_children, 4);
    assert!(!tree.all_terminal());
    assert_eq!(tree.overall_progress, 0.25);
}

#[test]
fn eta_extrapolates_linearly() {
    // 2 of 8 done after 1000ms elapsed -> 3000ms remaining
    let tree = TreeStatus::compute(counts(6, 0, 2, 0, 0), Some(1_000), 2_000);
    assert_eq!(tree.eta_ms, Some(3_000));
}

#[test]
fn eta_absent_before_first_completion() {
    let tree = TreeStatus::compute(counts(3, 1, 0, 0, 0), Some(0), 500);
    assert_eq!(tree.eta_ms, None);
}

#[test]
fn eta_absent_when_never_started() {
    let tree = TreeStatus::compute(counts(0, 0, 1, 0, 0), None, 500);
    assert_eq!(tree.eta_ms, None);
}

#[test]
fn record_tallies_each_status() {
    let mut c = StatusCounts::default();
    c.record(JobStatus::Pending);
    c.record(JobStatus::Running);
    c.record(JobStatus::Completed);
    c.record(JobStatus::Failed);
    c.record(JobStatus::Cancelled);
    c.record(JobStatus::Completed);
    assert_eq!(c.total(), 6);
    assert_eq!(c.terminal(), 4);
}
