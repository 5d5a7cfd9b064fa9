// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default production collaborators.
//!
//! These are the batteries the daemon ships with: a file-backed document
//! store, an HTTP page fetcher, a local echo agent, and a document-count
//! search index. Deployments with real renderers, model backends, or a
//! places API swap their own implementations into the
//! [`quaero_engine::AdapterSet`].

use async_trait::async_trait;
use parking_lot::Mutex;
use quaero_adapters::{
    AdapterError, AgentClient, Document, DocumentFilter, DocumentStore, FetchedPage, PageFetcher,
    Place, PlacesClient, SearchIndex,
};
use quaero_engine::AdapterSet;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

/// Build the default adapter set rooted in `state_dir`.
pub fn default_set(state_dir: &Path) -> Result<AdapterSet, AdapterError> {
    std::fs::create_dir_all(state_dir).map_err(|e| AdapterError::Unavailable(e.to_string()))?;
    let documents = Arc::new(FsDocumentStore::open(state_dir.join("documents.json"))?);
    Ok(AdapterSet {
        documents: Arc::clone(&documents) as Arc<dyn DocumentStore>,
        fetcher: Arc::new(HttpPageFetcher::new()),
        agents: Arc::new(EchoAgentClient),
        index: Arc::new(DocumentCountIndex {
            documents: Arc::clone(&documents),
        }),
        places: Arc::new(UnconfiguredPlacesClient),
    })
}

/// Keyed document storage persisted as one JSON file.
pub struct FsDocumentStore {
    path: PathBuf,
    documents: Mutex<BTreeMap<String, Document>>,
}

impl FsDocumentStore {
    pub fn open(path: PathBuf) -> Result<Self, AdapterError> {
        let documents = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "document store unreadable, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(AdapterError::Unavailable(e.to_string())),
        };
        Ok(Self {
            path,
            documents: Mutex::new(documents),
        })
    }

    fn persist(&self, documents: &BTreeMap<String, Document>) -> Result<(), AdapterError> {
        let json = serde_json::to_vec_pretty(documents)
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn upsert(&self, document: Document) -> Result<bool, AdapterError> {
        let mut documents = self.documents.lock();
        let created = !documents.contains_key(&document.id);
        documents.insert(document.id.clone(), document);
        self.persist(&documents)?;
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
        let mut documents = self.documents.lock();
        let document = documents
            .get_mut(id)
            .ok_or_else(|| AdapterError::NotFound(id.to_string()))?;
        document.metadata.insert(key.to_string(), value);
        self.persist(&documents)?;
        Ok(())
    }

    async fn compact(&self) -> Result<(), AdapterError> {
        let documents = self.documents.lock();
        self.persist(&documents)
    }
}

#[allow(clippy::expect_used)]
static TITLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static HREF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href\s*=\s*["']([^"'#]+)["']"#).expect("constant regex pattern is valid"));

/// Plain HTTP fetcher.
///
/// Rendering (headless browser), auth-cookie injection, and proper
/// HTML-to-markdown conversion are external concerns; this fetcher does a
/// straight GET, pulls the title and href targets, and passes the body
/// through.
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a discovered href against the page URL. Absolute URLs pass
/// through; host-relative paths are joined to the page's origin.
pub(crate) fn absolutize(page_url: &str, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    if let Some(path) = href.strip_prefix('/') {
        let scheme_end = page_url.find("://")?;
        let origin_end = page_url[scheme_end + 3..]
            .find('/')
            .map(|i| scheme_end + 3 + i)
            .unwrap_or(page_url.len());
        return Some(format!("{}/{}", &page_url[..origin_end], path));
    }
    None
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str, auth_id: Option<&str>) -> Result<FetchedPage, AdapterError> {
        if let Some(auth_id) = auth_id {
            tracing::debug!(url, auth_id, "auth credentials are handled by the connector store, fetching anonymously");
        }
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AdapterError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(AdapterError::FetchFailed {
                url: url.to_string(),
                reason: format!("status {}", response.status()),
            });
        }
        let body = response.text().await.map_err(|e| AdapterError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let title = TITLE_PATTERN
            .captures(&body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| url.to_string());
        let links = HREF_PATTERN
            .captures_iter(&body)
            .filter_map(|c| c.get(1))
            .filter_map(|m| absolutize(url, m.as_str()))
            .collect();

        Ok(FetchedPage {
            url: url.to_string(),
            title,
            content_markdown: body,
            links,
        })
    }
}

/// Local fallback agent: summarizes from the document itself. Real model
/// backends replace this.
pub struct EchoAgentClient;

#[async_trait]
impl AgentClient for EchoAgentClient {
    async fn run(
        &self,
        agent_type: &str,
        document: &Document,
    ) -> Result<serde_json::Value, AdapterError> {
        let excerpt: String = document.content_markdown.chars().take(240).collect();
        Ok(serde_json::json!({
            "agent_type": agent_type,
            "title": document.title,
            "excerpt": excerpt,
        }))
    }
}

/// Index stand-in that reports the corpus size on rebuild.
pub struct DocumentCountIndex {
    documents: Arc<FsDocumentStore>,
}

#[async_trait]
impl SearchIndex for DocumentCountIndex {
    async fn reindex_all(&self) -> Result<u64, AdapterError> {
        Ok(self.documents.len() as u64)
    }
}

/// Places search needs an external API; without one every search fails
/// loudly instead of silently returning nothing.
pub struct UnconfiguredPlacesClient;

#[async_trait]
impl PlacesClient for UnconfiguredPlacesClient {
    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<Place>, AdapterError> {
        Err(AdapterError::Unavailable(format!(
            "no places client configured (query was '{query}')"
        )))
    }
}
