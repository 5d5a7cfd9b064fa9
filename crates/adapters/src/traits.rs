// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborator traits.

use crate::document::{Document, DocumentFilter};
use crate::error::AdapterError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Keyed document storage. Upserts by id: re-processing a URL updates
/// rather than duplicates, which is what makes crawl redelivery safe.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Insert or update. Returns true when the document was newly created.
    async fn upsert(&self, document: Document) -> Result<bool, AdapterError>;

    async fn get(&self, id: &str) -> Result<Option<Document>, AdapterError>;

    /// Ids of documents matching `filter`, for work-set construction.
    async fn find_ids(&self, filter: &DocumentFilter) -> Result<Vec<String>, AdapterError>;

    /// Write one metadata key on an existing document.
    async fn set_metadata(
        &self,
        id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), AdapterError>;

    /// Storage maintenance (compaction-style housekeeping).
    async fn compact(&self) -> Result<(), AdapterError>;
}

/// A rendered page, already converted to markdown by the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,
    pub title: String,
    pub content_markdown: String,
    /// Outbound links discovered on the page, absolute URLs.
    pub links: Vec<String>,
}

/// Page rendering and extraction (headless browser + markdown conversion
/// in production).
#[async_trait]
pub trait PageFetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &str, auth_id: Option<&str>) -> Result<FetchedPage, AdapterError>;
}

/// AI agent invocation against one document.
#[async_trait]
pub trait AgentClient: Send + Sync + 'static {
    async fn run(
        &self,
        agent_type: &str,
        document: &Document,
    ) -> Result<serde_json::Value, AdapterError>;
}

/// Full-text / vector index maintenance.
#[async_trait]
pub trait SearchIndex: Send + Sync + 'static {
    /// Rebuild the index; returns the number of documents indexed.
    async fn reindex_all(&self) -> Result<u64, AdapterError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// Place-search API (Google Places in production).
#[async_trait]
pub trait PlacesClient: Send + Sync + 'static {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Place>, AdapterError>;
}
