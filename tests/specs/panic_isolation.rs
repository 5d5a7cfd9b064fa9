// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A worker panic fails its own job and nothing else.

use crate::support::{definitions, step_children, step_parent, wait_queue_empty, wait_terminal, world, WorldConfig};
use quaero_core::JobStatus;

const THREE_SEEDS: &str = r#"
id = "panic-run"
[[steps]]
name = "crawl"
action = "crawl"
[steps.config]
seeds = ["https://p.dev/u1", "https://p.dev/u2", "https://p.dev/u3"]
max_depth = 1
"#;

#[tokio::test]
async fn panicking_worker_is_contained() {
    let w = world(definitions(&[THREE_SEEDS]), WorldConfig::default()).await;
    w.fetcher.page("https://p.dev/u1", &[]);
    w.fetcher.page("https://p.dev/u3", &[]);
    w.fetcher.panic_on("https://p.dev/u2");

    let root = w.runtime.execute("panic-run").unwrap();
    let done = wait_terminal(&w, &root.id).await;
    wait_queue_empty(&w).await;

    let children = step_children(&w, &root.id, 0);
    let failed: Vec<_> = children
        .iter()
        .filter(|c| c.status == JobStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].name, "https://p.dev/u2");
    let error = failed[0].error.as_deref().unwrap();
    assert!(error.contains("panicked"));
    assert!(error.contains("scripted to panic"));

    // Siblings unaffected
    assert_eq!(
        children
            .iter()
            .filter(|c| c.status == JobStatus::Completed)
            .count(),
        2
    );
    assert_eq!(w.documents.len(), 2);

    // Default tolerance (0 = unlimited) means the parent and root complete
    assert_eq!(step_parent(&w, &root.id, 0).status, JobStatus::Completed);
    assert_eq!(done.status, JobStatus::Completed);

    w.runtime.shutdown().await;
}
