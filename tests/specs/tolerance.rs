// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error tolerance: stop_all cancels the surviving siblings.

use crate::support::{
    count_status, definitions, step_children, step_parent, wait_queue_empty, wait_terminal, world,
    WorldConfig,
};
use quaero_core::JobStatus;
use std::time::Duration;

const STOP_ALL: &str = r#"
id = "tolerance-run"

[error_tolerance]
max_child_failures = 1
failure_action = "stop_all"

[[steps]]
name = "crawl"
action = "crawl"
[steps.config]
seeds = [
    "https://t.dev/u1",
    "https://t.dev/u2",
    "https://t.dev/u3",
    "https://t.dev/u4",
    "https://t.dev/u5",
]
max_depth = 1

[[steps]]
name = "transform"
action = "transform"
"#;

#[tokio::test]
async fn stop_all_cancels_siblings_and_fails_the_run() {
    let w = world(definitions(&[STOP_ALL]), WorldConfig::default()).await;
    // u1/u2 fail instantly; the rest stall long enough for the
    // orchestrator to observe the breach
    w.fetcher.fail_on("https://t.dev/u1");
    w.fetcher.fail_on("https://t.dev/u2");
    w.fetcher.delay(Duration::from_millis(500));
    w.fetcher.page("https://t.dev/u3", &[]);
    w.fetcher.page("https://t.dev/u4", &[]);
    w.fetcher.page("https://t.dev/u5", &[]);

    let root = w.runtime.execute("tolerance-run").unwrap();
    let done = wait_terminal(&w, &root.id).await;
    wait_queue_empty(&w).await;

    assert_eq!(done.status, JobStatus::Failed);

    let crawl_parent = step_parent(&w, &root.id, 0);
    assert_eq!(crawl_parent.status, JobStatus::Failed);
    assert!(crawl_parent
        .error
        .as_deref()
        .unwrap()
        .contains("tolerance breached"));

    let children = step_children(&w, &root.id, 0);
    assert_eq!(children.len(), 5);
    assert_eq!(count_status(&children, JobStatus::Failed), 2);
    // The other three were cancelled whether they had started or not
    assert_eq!(count_status(&children, JobStatus::Cancelled), 3);

    // The transform step never ran
    assert_eq!(w.runtime.jobs().list_children(&root.id).len(), 1);
    let steps = done.result.unwrap()["steps"].as_array().unwrap().clone();
    assert_eq!(steps.len(), 1);

    w.runtime.shutdown().await;
}

#[tokio::test]
async fn unlimited_tolerance_completes_despite_failures() {
    let w = world(
        definitions(&[r#"
id = "lenient-run"

[error_tolerance]
max_child_failures = 0
failure_action = "stop_all"

[[steps]]
name = "crawl"
action = "crawl"
[steps.config]
seeds = ["https://l.dev/ok", "https://l.dev/bad"]
max_depth = 1
"#]),
        WorldConfig::default(),
    )
    .await;
    w.fetcher.page("https://l.dev/ok", &[]);
    w.fetcher.fail_on("https://l.dev/bad");

    let root = w.runtime.execute("lenient-run").unwrap();
    let done = wait_terminal(&w, &root.id).await;

    // max_child_failures = 0 means unlimited, not fail-on-first
    assert_eq!(done.status, JobStatus::Completed);
    let children = step_children(&w, &root.id, 0);
    assert_eq!(count_status(&children, JobStatus::Failed), 1);
    assert_eq!(count_status(&children, JobStatus::Completed), 1);

    w.runtime.shutdown().await;
}
