// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Visibility expiry during a long execution: duplicate delivery, one
//! final state.

use crate::support::{definitions, step_children, wait_queue_empty, wait_terminal, world, WorldConfig};
use quaero_core::JobStatus;
use std::time::Duration;

const SLOW_CRAWL: &str = r#"
id = "slow-crawl"
[[steps]]
name = "crawl"
action = "crawl"
[steps.config]
seeds = ["https://s.dev/only"]
max_depth = 1
"#;

#[tokio::test]
async fn expired_visibility_redelivers_without_duplicating_state() {
    let w = world(
        definitions(&[SLOW_CRAWL]),
        WorldConfig {
            // Work takes far longer than visibility and never extends
            visibility_timeout: Duration::from_millis(80),
            concurrency: 2,
            ..WorldConfig::default()
        },
    )
    .await;
    w.fetcher.page("https://s.dev/only", &[]);
    w.fetcher.delay(Duration::from_millis(300));

    let root = w.runtime.execute("slow-crawl").unwrap();
    let done = wait_terminal(&w, &root.id).await;
    wait_queue_empty(&w).await;

    assert_eq!(done.status, JobStatus::Completed);

    // The message was delivered more than once...
    assert!(
        w.fetcher.fetched().len() >= 2,
        "expected a duplicate delivery, got {:?}",
        w.fetcher.fetched()
    );
    // ...but the keyed store holds exactly one document and the job
    // settled exactly once
    assert_eq!(w.documents.len(), 1);
    let children = step_children(&w, &root.id, 0);
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].status, JobStatus::Completed);

    w.runtime.shutdown().await;
}
