// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancelling a running root mid-flight.

use crate::support::{definitions, step_children, wait_queue_empty, world, WorldConfig};
use quaero_core::JobStatus;
use std::time::Duration;

fn ten_seed_definition() -> &'static str {
    r#"
id = "big-crawl"
[[steps]]
name = "crawl"
action = "crawl"
[steps.config]
seeds = [
    "https://c.dev/1", "https://c.dev/2", "https://c.dev/3", "https://c.dev/4",
    "https://c.dev/5", "https://c.dev/6", "https://c.dev/7", "https://c.dev/8",
    "https://c.dev/9", "https://c.dev/10",
]
max_depth = 1
"#
}

#[tokio::test]
async fn cancelling_root_settles_every_descendant() {
    let w = world(
        definitions(&[ten_seed_definition()]),
        WorldConfig {
            concurrency: 3,
            ..WorldConfig::default()
        },
    )
    .await;
    for n in 1..=10 {
        w.fetcher.page(&format!("https://c.dev/{n}"), &[]);
    }
    w.fetcher.delay(Duration::from_millis(100));

    let root = w.runtime.execute("big-crawl").unwrap();
    // Let a few children finish while others are running or still queued
    tokio::time::sleep(Duration::from_millis(250)).await;

    let cancelled = w.runtime.cancel_job(&root.id).unwrap();
    assert!(cancelled > 0);

    // Root flips immediately; in-flight workers observe the cancel at
    // their next checkpoint and queued messages short-circuit
    assert_eq!(
        w.runtime.jobs().get(&root.id).unwrap().status,
        JobStatus::Cancelled
    );
    wait_queue_empty(&w).await;

    let children = step_children(&w, &root.id, 0);
    assert_eq!(children.len(), 10);
    assert!(children.iter().all(|c| c.is_terminal()));
    assert!(children
        .iter()
        .all(|c| matches!(c.status, JobStatus::Completed | JobStatus::Cancelled)));
    // Mid-flight cancel: some finished, some never got to run
    assert!(children.iter().any(|c| c.status == JobStatus::Cancelled));

    w.runtime.shutdown().await;
}
