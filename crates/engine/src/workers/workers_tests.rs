// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{claim, harness, spawn_child_under_parent};
use crate::worker::{Worker, WorkerContext};
use crate::workers::crawler::{link_passes, origin};
use quaero_adapters::fakes::{FakeAgentClient, FakeDocumentStore, FakeFetcher, FakeSearchIndex};
use quaero_adapters::Document;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use yare::parameterized;

#[parameterized(
    plain = { "https://a.dev/path/x", Some("https://a.dev") },
    no_path = { "https://a.dev", Some("https://a.dev") },
    with_port = { "http://a.dev:8080/x", Some("http://a.dev:8080") },
    relative = { "/just/a/path", None },
)]
fn origin_extraction(url: &str, expected: Option<&str>) {
    assert_eq!(origin(url), expected);
}

#[parameterized(
    same_origin = { "https://a.dev/x", "https://a.dev/y", true },
    self_link = { "https://a.dev/x", "https://a.dev/x", false },
    foreign = { "https://a.dev/x", "https://b.dev/y", false },
    relative = { "https://a.dev/x", "/y", false },
)]
fn link_filtering(page: &str, link: &str, passes: bool) {
    assert_eq!(link_passes(page, link), passes);
}

#[test]
fn require_payload_str_rejects_missing_and_empty() {
    let job = quaero_core::Job::create(
        quaero_core::JobSeed::new("j", "t").payload(serde_json::json!({"url": ""})),
        1,
    );
    assert!(require_payload_str(&job, "url").is_err());
    assert!(require_payload_str(&job, "absent").is_err());
}

async fn crawler_ctx(
    services: &crate::services::Services,
    payload: serde_json::Value,
) -> WorkerContext {
    let (_, child) = spawn_child_under_parent(services, "crawler_url", payload);
    let (message, receipt) = claim(services).await;
    WorkerContext::new(
        child,
        message.depth,
        services.clone(),
        receipt,
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn crawler_stores_document_and_spawns_links() {
    let h = harness();
    let documents = Arc::new(FakeDocumentStore::new());
    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.page(
        "https://a.dev/start",
        &["https://a.dev/child", "https://other.dev/skip", "https://a.dev/start"],
    );
    let worker = CrawlerWorker::new(Arc::clone(&fetcher) as _, Arc::clone(&documents) as _);

    let ctx = crawler_ctx(
        &h.services,
        serde_json::json!({"url": "https://a.dev/start", "max_depth": 1}),
    )
    .await;
    let result = worker.execute(&ctx).await.unwrap();

    assert!(documents.document("https://a.dev/start").is_some());
    assert_eq!(result["children_spawned"], serde_json::json!(1));
    // One new message for the same-origin link
    assert_eq!(h.services.queue.stats(1).pending, 1);
}

#[tokio::test]
async fn crawler_at_depth_limit_spawns_nothing() {
    let h = harness();
    let documents = Arc::new(FakeDocumentStore::new());
    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.page("https://a.dev/leaf", &["https://a.dev/deeper"]);
    let worker = CrawlerWorker::new(Arc::clone(&fetcher) as _, Arc::clone(&documents) as _);

    // depth == max_depth: links are discovered but not followed
    let (_, child) = spawn_child_under_parent(
        &h.services,
        "crawler_url",
        serde_json::json!({"url": "https://a.dev/leaf", "max_depth": 1}),
    );
    let (_, receipt) = claim(&h.services).await;
    let ctx = WorkerContext::new(child, 1, h.services.clone(), receipt, CancellationToken::new());

    let result = worker.execute(&ctx).await.unwrap();
    assert_eq!(result["children_spawned"], serde_json::json!(0));
    assert_eq!(h.services.queue.stats(1).pending, 0);
}

#[tokio::test]
async fn crawler_skips_already_stored_targets() {
    let h = harness();
    let documents = Arc::new(FakeDocumentStore::new());
    documents.insert(Document {
        id: "https://a.dev/known".to_string(),
        ..Document::default()
    });
    let fetcher = Arc::new(FakeFetcher::new());
    fetcher.page("https://a.dev/start", &["https://a.dev/known", "https://a.dev/new"]);
    let worker = CrawlerWorker::new(Arc::clone(&fetcher) as _, Arc::clone(&documents) as _);

    let ctx = crawler_ctx(
        &h.services,
        serde_json::json!({"url": "https://a.dev/start", "max_depth": 2}),
    )
    .await;
    let result = worker.execute(&ctx).await.unwrap();
    assert_eq!(result["children_spawned"], serde_json::json!(1));
}

#[tokio::test]
async fn crawler_validate_requires_url() {
    let worker = CrawlerWorker::new(
        Arc::new(FakeFetcher::new()) as _,
        Arc::new(FakeDocumentStore::new()) as _,
    );
    let bad = quaero_core::Job::create(quaero_core::JobSeed::new("j", "crawler_url"), 1);
    assert!(worker.validate(&bad).is_err());
}

#[tokio::test]
async fn agent_worker_annotates_document() {
    let h = harness();
    let documents = Arc::new(FakeDocumentStore::new());
    documents.insert(Document {
        id: "doc-1".to_string(),
        title: "Intro".to_string(),
        ..Document::default()
    });
    let agents = Arc::new(FakeAgentClient::new());
    let worker = AgentWorker::new(Arc::clone(&documents) as _, Arc::clone(&agents) as _);

    let (_, child) = spawn_child_under_parent(
        &h.services,
        "agent",
        serde_json::json!({"document_id": "doc-1", "agent_type": "summarizer"}),
    );
    let (message, receipt) = claim(&h.services).await;
    let ctx = WorkerContext::new(
        child,
        message.depth,
        h.services.clone(),
        receipt,
        CancellationToken::new(),
    );

    worker.execute(&ctx).await.unwrap();
    let doc = documents.document("doc-1").unwrap();
    assert!(doc.metadata.contains_key("summarizer"));
    assert_eq!(agents.calls().len(), 1);
}

#[tokio::test]
async fn agent_worker_fails_on_missing_document() {
    let h = harness();
    let worker = AgentWorker::new(
        Arc::new(FakeDocumentStore::new()) as _,
        Arc::new(FakeAgentClient::new()) as _,
    );
    let (_, child) = spawn_child_under_parent(
        &h.services,
        "agent",
        serde_json::json!({"document_id": "ghost", "agent_type": "summarizer"}),
    );
    let (message, receipt) = claim(&h.services).await;
    let ctx = WorkerContext::new(
        child,
        message.depth,
        h.services.clone(),
        receipt,
        CancellationToken::new(),
    );

    let err = worker.execute(&ctx).await.unwrap_err();
    assert!(err.to_string().contains("document not found"));
}

#[tokio::test]
async fn maintenance_worker_routes_operations() {
    let h = harness();
    let documents = Arc::new(FakeDocumentStore::new());
    let index = Arc::new(FakeSearchIndex::with_documents(3));
    let worker = MaintenanceWorker::new(Arc::clone(&documents) as _, Arc::clone(&index) as _);

    let (_, child) = spawn_child_under_parent(
        &h.services,
        "database_maintenance",
        serde_json::json!({"operation": "reindex_search"}),
    );
    let (message, receipt) = claim(&h.services).await;
    let ctx = WorkerContext::new(
        child,
        message.depth,
        h.services.clone(),
        receipt,
        CancellationToken::new(),
    );

    let result = worker.execute(&ctx).await.unwrap();
    assert_eq!(result["detail"]["documents_indexed"], serde_json::json!(3));
    assert_eq!(index.reindex_count(), 1);
}

#[tokio::test]
async fn maintenance_worker_rejects_unknown_operation() {
    let h = harness();
    let worker = MaintenanceWorker::new(
        Arc::new(FakeDocumentStore::new()) as _,
        Arc::new(FakeSearchIndex::with_documents(0)) as _,
    );
    let (_, child) = spawn_child_under_parent(
        &h.services,
        "database_maintenance",
        serde_json::json!({"operation": "defragment_floppy"}),
    );
    let (message, receipt) = claim(&h.services).await;
    let ctx = WorkerContext::new(
        child,
        message.depth,
        h.services.clone(),
        receipt,
        CancellationToken::new(),
    );

    let err = worker.execute(&ctx).await.unwrap_err();
    assert!(matches!(err, crate::error::EngineError::Validation(_)));
}

#[tokio::test]
async fn cancelled_context_short_circuits_execution() {
    let h = harness();
    let fetcher = Arc::new(FakeFetcher::new());
    let worker = CrawlerWorker::new(
        Arc::clone(&fetcher) as _,
        Arc::new(FakeDocumentStore::new()) as _,
    );
    let (_, child) = spawn_child_under_parent(
        &h.services,
        "crawler_url",
        serde_json::json!({"url": "https://a.dev/x", "max_depth": 0}),
    );
    let (message, receipt) = claim(&h.services).await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let ctx = WorkerContext::new(child, message.depth, h.services.clone(), receipt, cancel);

    let err = worker.execute(&ctx).await.unwrap_err();
    assert!(err.is_cancellation());
    // Never reached the fetcher
    assert!(fetcher.fetched().is_empty());
}
