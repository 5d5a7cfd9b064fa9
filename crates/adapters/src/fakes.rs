// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fake collaborators for tests.
//!
//! Deterministic, lock-guarded, and scriptable: fetchers can be told to
//! fail or panic on specific URLs so worker error paths and the pool's
//! panic barrier can be exercised without real collaborators.

// Fakes deliberately panic when scripted to; tests depend on it.
#![allow(clippy::panic)]

use crate::document::{Document, DocumentFilter};
use crate::error::AdapterError;
use crate::traits::{
    AgentClient, DocumentStore, FetchedPage, PageFetcher, Place, PlacesClient, SearchIndex,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Keyed in-memory document store.
#[derive(Clone, Default)]
pub struct FakeDocumentStore {
    documents: Arc<Mutex<BTreeMap<String, Document>>>,
    compactions: Arc<Mutex<u64>>,
}

impl FakeDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: Document) {
        self.documents.lock().insert(document.id.clone(), document);
    }

    pub fn document(&self, id: &str) -> Option<Document> {
        self.documents.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }

    pub fn compactions(&self) -> u64 {
        *self.compactions.lock()
    }
}

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn upsert(&self, document: Document) -> Result<bool, AdapterError> {
        let mut docs = self.documents.lock();
        let created = !docs.contains_key(&document.id);
        docs.insert(document.id.clone(), document);
        Ok(created)
    }

    async fn get(&self, id: &str) -> Result<Option<Document>, AdapterError> {
        Ok(self.documents.lock().get(id).cloned())
    }

    async fn find_ids(&self, filter: &DocumentFilter) -> Result<Vec<String>, AdapterError> {
        Ok(self
            .documents
            .lock()
            .values()
            .filter(|d| filter.matches(d))
            .map(|d| d.id.clone())
            .collect())
    }

    async fn set_metadata(
        &self,
        id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), AdapterError> {
        let mut docs = self.documents.lock();
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| AdapterError::NotFound(id.to_string()))?;
        doc.metadata.insert(key.to_string(), value);
        Ok(())
    }

    async fn compact(&self) -> Result<(), AdapterError> {
        *self.compactions.lock() += 1;
        Ok(())
    }
}

/// Scriptable page fetcher: pages registered per URL, with optional
/// failure and panic triggers.
#[derive(Clone, Default)]
pub struct FakeFetcher {
    pages: Arc<Mutex<BTreeMap<String, FetchedPage>>>,
    fail_urls: Arc<Mutex<HashSet<String>>>,
    panic_urls: Arc<Mutex<HashSet<String>>>,
    fetched: Arc<Mutex<Vec<String>>>,
    delay: Arc<Mutex<Option<std::time::Duration>>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page with outbound links.
    pub fn page(&self, url: &str, links: &[&str]) -> &Self {
        self.pages.lock().insert(
            url.to_string(),
            FetchedPage {
                url: url.to_string(),
                title: format!("Title of {url}"),
                content_markdown: format!("# {url}\n\nbody"),
                links: links.iter().map(|l| l.to_string()).collect(),
            },
        );
        self
    }

    /// Make fetches of `url` return an error.
    pub fn fail_on(&self, url: &str) -> &Self {
        self.fail_urls.lock().insert(url.to_string());
        self
    }

    /// Make fetches of `url` panic (for panic-barrier tests).
    pub fn panic_on(&self, url: &str) -> &Self {
        self.panic_urls.lock().insert(url.to_string());
        self
    }

    /// Stall successful fetches, for cancellation and visibility tests.
    pub fn delay(&self, delay: std::time::Duration) -> &Self {
        *self.delay.lock() = Some(delay);
        self
    }

    /// URLs fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, _auth_id: Option<&str>) -> Result<FetchedPage, AdapterError> {
        if self.panic_urls.lock().contains(url) {
            panic!("fetcher scripted to panic on {url}");
        }
        self.fetched.lock().push(url.to_string());
        if self.fail_urls.lock().contains(url) {
            return Err(AdapterError::FetchFailed {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.pages.lock().get(url) {
            Some(page) => Ok(page.clone()),
            // Unregistered URLs render as empty leaf pages
            None => Ok(FetchedPage {
                url: url.to_string(),
                title: url.to_string(),
                content_markdown: String::new(),
                links: Vec::new(),
            }),
        }
    }
}

/// Agent client returning a canned annotation per agent type.
#[derive(Clone, Default)]
pub struct FakeAgentClient {
    calls: Arc<Mutex<Vec<(String, String)>>>,
    fail_documents: Arc<Mutex<HashSet<String>>>,
}

impl FakeAgentClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on_document(&self, id: &str) -> &Self {
        self.fail_documents.lock().insert(id.to_string());
        self
    }

    /// `(agent_type, document_id)` pairs observed.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AgentClient for FakeAgentClient {
    async fn run(
        &self,
        agent_type: &str,
        document: &Document,
    ) -> Result<serde_json::Value, AdapterError> {
        self.calls
            .lock()
            .push((agent_type.to_string(), document.id.clone()));
        if self.fail_documents.lock().contains(&document.id) {
            return Err(AdapterError::AgentFailed(format!(
                "scripted failure on {}",
                document.id
            )));
        }
        Ok(serde_json::json!({
            "agent_type": agent_type,
            "summary": format!("summary of {}", document.title),
        }))
    }
}

/// Index fake counting rebuilds.
#[derive(Clone, Default)]
pub struct FakeSearchIndex {
    reindexed: Arc<Mutex<u64>>,
    documents: u64,
}

impl FakeSearchIndex {
    pub fn with_documents(documents: u64) -> Self {
        Self {
            reindexed: Arc::default(),
            documents,
        }
    }

    pub fn reindex_count(&self) -> u64 {
        *self.reindexed.lock()
    }
}

#[async_trait]
impl SearchIndex for FakeSearchIndex {
    async fn reindex_all(&self) -> Result<u64, AdapterError> {
        *self.reindexed.lock() += 1;
        Ok(self.documents)
    }
}

/// Places client returning a fixed result page per query.
#[derive(Clone, Default)]
pub struct FakePlacesClient {
    results: Arc<Mutex<BTreeMap<String, Vec<Place>>>>,
}

impl FakePlacesClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self, query: &str, places: Vec<Place>) -> &Self {
        self.results.lock().insert(query.to_string(), places);
        self
    }
}

#[async_trait]
impl PlacesClient for FakePlacesClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Place>, AdapterError> {
        let results = self.results.lock();
        let mut places = results.get(query).cloned().unwrap_or_default();
        places.truncate(max_results);
        Ok(places)
    }
}

#[cfg(test)]
#[path = "fakes_tests.rs"]
mod tests;
