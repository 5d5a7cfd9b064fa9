// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::harness;
use quaero_adapters::fakes::{FakeDocumentStore, FakePlacesClient, FakeSearchIndex};
use quaero_adapters::{Document, Place};
use quaero_core::JobStatus;
use quaero_definition::ErrorPolicy;
use std::sync::Arc;

fn definition_with(steps: Vec<StepDef>) -> JobDefinition {
    JobDefinition {
        id: "test-def".to_string(),
        name: "test definition".to_string(),
        description: String::new(),
        kind: "test".to_string(),
        schedule: String::new(),
        timeout: None,
        enabled: true,
        auto_start: false,
        tags: Vec::new(),
        base_url: None,
        auth_id: None,
        pre_jobs: Vec::new(),
        post_jobs: Vec::new(),
        steps,
        error_tolerance: quaero_core::ErrorTolerance::default(),
    }
}

fn step(action: &str, config: serde_json::Value) -> StepDef {
    StepDef {
        name: format!("{action} step"),
        action: action.to_string(),
        on_error: ErrorPolicy::Fail,
        config,
    }
}

fn root(services: &Services) -> JobId {
    services
        .jobs
        .create_parent_job(quaero_core::JobSeed::new("root", "definition_run"))
        .unwrap()
        .id
}

#[tokio::test]
async fn crawl_manager_enqueues_one_child_per_seed() {
    let h = harness();
    let manager = CrawlManager::new(h.services.clone());
    let step = step(
        "crawl",
        serde_json::json!({"seeds": ["https://a.dev/1", "https://a.dev/2", "https://a.dev/3"], "max_depth": 1}),
    );
    let def = definition_with(vec![step.clone()]);
    let root = root(&h.services);

    let parent_id = manager
        .create_parent_job(&step, &def, &root, 0)
        .await
        .unwrap();

    let parent = h.services.jobs.get(&parent_id).unwrap();
    assert_eq!(parent.status, JobStatus::Running);
    assert_eq!(parent.parent_id, Some(root));
    assert_eq!(parent.step_index, Some(0));
    assert_eq!(parent.progress_total, 3);

    let children = h.services.jobs.list_children(&parent_id);
    assert_eq!(children.len(), 3);
    assert!(children.iter().all(|c| c.job_type == "crawler_url"));
    assert_eq!(h.services.queue.stats(1).total, 3);
}

#[tokio::test]
async fn crawl_manager_falls_back_to_base_url() {
    let h = harness();
    let manager = CrawlManager::new(h.services.clone());
    let step = step("crawl", serde_json::Value::Null);
    let mut def = definition_with(vec![step.clone()]);
    def.base_url = Some("https://base.dev".to_string());
    let root = root(&h.services);

    let parent_id = manager
        .create_parent_job(&step, &def, &root, 0)
        .await
        .unwrap();
    let children = h.services.jobs.list_children(&parent_id);
    assert_eq!(children.len(), 1);
    assert_eq!(
        children[0].payload.get("url").and_then(|v| v.as_str()),
        Some("https://base.dev")
    );
}

#[tokio::test]
async fn crawl_manager_with_no_seeds_leaves_empty_parent() {
    let h = harness();
    let manager = CrawlManager::new(h.services.clone());
    let step = step("crawl", serde_json::Value::Null);
    let def = definition_with(vec![step.clone()]);
    let root = root(&h.services);

    let parent_id = manager
        .create_parent_job(&step, &def, &root, 0)
        .await
        .unwrap();
    assert!(h.services.jobs.list_children(&parent_id).is_empty());
    // Still running: the monitor closes empty parents on its next tick
    assert_eq!(
        h.services.jobs.get(&parent_id).unwrap().status,
        JobStatus::Running
    );
}

#[tokio::test]
async fn agent_manager_spawns_only_unannotated_documents() {
    let h = harness();
    let documents = Arc::new(FakeDocumentStore::new());
    documents.insert(Document {
        id: "doc-a".to_string(),
        source_url: Some("https://a.dev/a".to_string()),
        ..Document::default()
    });
    let mut annotated = Document {
        id: "doc-b".to_string(),
        source_url: Some("https://a.dev/b".to_string()),
        ..Document::default()
    };
    annotated
        .metadata
        .insert("summarizer".to_string(), serde_json::json!({}));
    documents.insert(annotated);

    let manager = AgentManager::new(h.services.clone(), documents);
    let step = step("agent", serde_json::json!({"agent_type": "summarizer"}));
    let def = definition_with(vec![step.clone()]);
    let root = root(&h.services);

    let parent_id = manager
        .create_parent_job(&step, &def, &root, 0)
        .await
        .unwrap();
    let children = h.services.jobs.list_children(&parent_id);
    assert_eq!(children.len(), 1);
    assert_eq!(
        children[0].payload.get("document_id").and_then(|v| v.as_str()),
        Some("doc-a")
    );
}

#[tokio::test]
async fn agent_manager_without_agent_type_fails_parent() {
    let h = harness();
    let manager = AgentManager::new(h.services.clone(), Arc::new(FakeDocumentStore::new()));
    let step = step("agent", serde_json::Value::Null);
    let def = definition_with(vec![step.clone()]);
    let root = root(&h.services);

    let parent_id = manager
        .create_parent_job(&step, &def, &root, 0)
        .await
        .unwrap();
    let parent = h.services.jobs.get(&parent_id).unwrap();
    assert_eq!(parent.status, JobStatus::Failed);
    assert!(parent.error.as_deref().unwrap().contains("agent_type"));
}

#[tokio::test]
async fn maintenance_manager_uses_default_operations() {
    let h = harness();
    let manager = MaintenanceManager::new(h.services.clone());
    let step = step("database_maintenance", serde_json::Value::Null);
    let def = definition_with(vec![step.clone()]);
    let root = root(&h.services);

    let parent_id = manager
        .create_parent_job(&step, &def, &root, 0)
        .await
        .unwrap();
    let children = h.services.jobs.list_children(&parent_id);
    assert_eq!(children.len(), 2);
    assert!(children
        .iter()
        .all(|c| c.job_type == "database_maintenance"));
}

#[tokio::test]
async fn transform_manager_completes_inline() {
    let h = harness();
    let documents = Arc::new(FakeDocumentStore::new());
    documents.insert(Document {
        id: "doc-a".to_string(),
        source_url: Some("https://a.dev/a".to_string()),
        ..Document::default()
    });

    let manager = TransformManager::new(h.services.clone(), Arc::clone(&documents) as _);
    let step = step("transform", serde_json::Value::Null);
    let def = definition_with(vec![step.clone()]);
    let root = root(&h.services);

    let parent_id = manager
        .create_parent_job(&step, &def, &root, 0)
        .await
        .unwrap();
    let parent = h.services.jobs.get(&parent_id).unwrap();
    assert_eq!(parent.status, JobStatus::Completed);
    assert_eq!(
        parent.result.unwrap()["documents_transformed"],
        serde_json::json!(1)
    );
    assert!(documents
        .document("doc-a")
        .unwrap()
        .metadata
        .contains_key("transform"));

    // Second run finds nothing left to do
    let again = manager
        .create_parent_job(&step, &def, &root, 0)
        .await
        .unwrap();
    assert_eq!(
        h.services.jobs.get(&again).unwrap().result.unwrap()["documents_transformed"],
        serde_json::json!(0)
    );
}

#[tokio::test]
async fn reindex_manager_reports_indexed_count() {
    let h = harness();
    let index = Arc::new(FakeSearchIndex::with_documents(42));
    let manager = ReindexManager::new(h.services.clone(), Arc::clone(&index) as _);
    let step = step("reindex", serde_json::Value::Null);
    let def = definition_with(vec![step.clone()]);
    let root = root(&h.services);

    let parent_id = manager
        .create_parent_job(&step, &def, &root, 0)
        .await
        .unwrap();
    let parent = h.services.jobs.get(&parent_id).unwrap();
    assert_eq!(parent.status, JobStatus::Completed);
    assert_eq!(
        parent.result.unwrap()["documents_indexed"],
        serde_json::json!(42)
    );
    assert_eq!(index.reindex_count(), 1);
}

#[tokio::test]
async fn places_manager_stores_results_as_documents() {
    let h = harness();
    let documents = Arc::new(FakeDocumentStore::new());
    let places = Arc::new(FakePlacesClient::new());
    places.results(
        "coffee near dock",
        vec![Place {
            id: "p1".to_string(),
            name: "Dock Espresso".to_string(),
            address: "1 Wharf Rd".to_string(),
            rating: Some(4.5),
        }],
    );

    let manager = PlacesSearchManager::new(
        h.services.clone(),
        places,
        Arc::clone(&documents) as _,
    );
    let step = step("places_search", serde_json::json!({"query": "coffee near dock"}));
    let def = definition_with(vec![step.clone()]);
    let root = root(&h.services);

    let parent_id = manager
        .create_parent_job(&step, &def, &root, 0)
        .await
        .unwrap();
    let parent = h.services.jobs.get(&parent_id).unwrap();
    assert_eq!(parent.status, JobStatus::Completed);
    assert_eq!(parent.result.unwrap()["places_found"], serde_json::json!(1));
    assert!(documents.document("place:p1").is_some());
}

#[tokio::test]
async fn complete_parent_tolerates_monitor_closing_first() {
    let h = harness();
    let step = step("transform", serde_json::Value::Null);
    let def = definition_with(vec![step.clone()]);
    let root = root(&h.services);
    let parent = create_step_parent(&h.services, &step, &def, &root, 0).unwrap();

    // A monitor tick can close a childless running parent while the
    // manager is still awaiting its adapter call
    h.services
        .transition(&parent.id, JobStatus::Completed)
        .unwrap();

    complete_parent(
        &h.services,
        &parent.id,
        serde_json::json!({"documents_transformed": 2}),
    )
    .unwrap();

    let closed = h.services.jobs.get(&parent.id).unwrap();
    assert_eq!(closed.status, JobStatus::Completed);
    assert_eq!(
        closed.result.unwrap()["documents_transformed"],
        serde_json::json!(2)
    );
}

#[tokio::test]
async fn places_manager_without_query_fails_parent() {
    let h = harness();
    let manager = PlacesSearchManager::new(
        h.services.clone(),
        Arc::new(FakePlacesClient::new()),
        Arc::new(FakeDocumentStore::new()),
    );
    let step = step("places_search", serde_json::Value::Null);
    let def = definition_with(vec![step.clone()]);
    let root = root(&h.services);

    let parent_id = manager
        .create_parent_job(&step, &def, &root, 0)
        .await
        .unwrap();
    assert_eq!(
        h.services.jobs.get(&parent_id).unwrap().status,
        JobStatus::Failed
    );
}
