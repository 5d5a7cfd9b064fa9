// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-step crawl → transform pipeline over three seed URLs.

use crate::support::{definitions, step_children, step_parent, wait_terminal, world, WorldConfig};
use quaero_core::{Event, JobStatus};

const CRAWL_THEN_TRANSFORM: &str = r#"
id = "docs-pipeline"
name = "docs pipeline"

[error_tolerance]
max_child_failures = 1
failure_action = "stop_all"

[[steps]]
name = "crawl"
action = "crawl"
[steps.config]
seeds = ["https://docs.dev/a", "https://docs.dev/b", "https://docs.dev/c"]
max_depth = 1

[[steps]]
name = "transform"
action = "transform"
"#;

#[tokio::test]
async fn crawl_then_transform_completes_the_root() {
    let w = world(definitions(&[CRAWL_THEN_TRANSFORM]), WorldConfig::default()).await;
    w.fetcher.page("https://docs.dev/a", &[]);
    w.fetcher.page("https://docs.dev/b", &[]);
    w.fetcher.page("https://docs.dev/c", &[]);
    let mut events = w.runtime.bus().subscribe();

    let root = w.runtime.execute("docs-pipeline").unwrap();
    assert_eq!(root.status, JobStatus::Pending);
    assert_eq!(root.progress_total, 2);

    let done = wait_terminal(&w, &root.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.progress_current, 2);

    // Crawl step: three children, all completed, parent progressed to 3/3
    let crawl_parent = step_parent(&w, &root.id, 0);
    assert_eq!(crawl_parent.status, JobStatus::Completed);
    assert_eq!(crawl_parent.progress_current, 3);
    assert_eq!(crawl_parent.progress_total, 3);
    let children = step_children(&w, &root.id, 0);
    assert_eq!(children.len(), 3);
    assert!(children.iter().all(|c| c.status == JobStatus::Completed));

    // Each crawler stored a document and announced it
    assert_eq!(w.documents.len(), 3);
    let mut saved = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, Event::DocumentSaved { .. }) {
            saved += 1;
        }
    }
    assert_eq!(saved, 3);

    // Transform step ran after the crawl finished and covered all docs
    let transform_parent = step_parent(&w, &root.id, 1);
    assert_eq!(transform_parent.status, JobStatus::Completed);
    assert_eq!(
        transform_parent.result.unwrap()["documents_transformed"],
        serde_json::json!(3)
    );

    // Root result references both steps in order
    let steps = done.result.unwrap()["steps"].as_array().unwrap().clone();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["step"], "crawl");
    assert_eq!(steps[1]["step"], "transform");

    w.runtime.shutdown().await;
}

#[tokio::test]
async fn discovered_links_are_crawled_one_level_deep() {
    let w = world(
        definitions(&[r#"
id = "link-crawl"
[[steps]]
name = "crawl"
action = "crawl"
[steps.config]
seeds = ["https://site.dev/root"]
max_depth = 1
"#]),
        WorldConfig::default(),
    )
    .await;
    w.fetcher.page(
        "https://site.dev/root",
        &["https://site.dev/one", "https://site.dev/two", "https://elsewhere.dev/skip"],
    );
    w.fetcher.page("https://site.dev/one", &["https://site.dev/too-deep"]);
    w.fetcher.page("https://site.dev/two", &[]);

    let root = w.runtime.execute("link-crawl").unwrap();
    let done = wait_terminal(&w, &root.id).await;

    assert_eq!(done.status, JobStatus::Completed);
    // Seed + two same-origin links; the foreign origin and the
    // depth-2 link were filtered
    assert_eq!(w.documents.len(), 3);
    assert!(w.documents.document("https://site.dev/one").is_some());
    assert!(w.documents.document("https://elsewhere.dev/skip").is_none());
    assert!(w.documents.document("https://site.dev/too-deep").is_none());

    let children = step_children(&w, &root.id, 0);
    assert_eq!(children.len(), 3);

    w.runtime.shutdown().await;
}
