// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crawler worker: render one URL, store the document, spawn link
//! children under the depth limit.

use super::require_payload_str;
use crate::error::EngineError;
use crate::worker::{Worker, WorkerContext};
use async_trait::async_trait;
use quaero_adapters::{Document, DocumentStore, PageFetcher};
use quaero_core::{CrawlStats, Event, Job, JobSeed, LogLevel};
use std::sync::Arc;

pub struct CrawlerWorker {
    fetcher: Arc<dyn PageFetcher>,
    documents: Arc<dyn DocumentStore>,
}

impl CrawlerWorker {
    pub fn new(fetcher: Arc<dyn PageFetcher>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { fetcher, documents }
    }
}

/// `scheme://host` prefix of a URL, if it has one.
pub(crate) fn origin(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")?;
    let host_start = scheme_end + 3;
    match url[host_start..].find('/') {
        Some(path_start) => Some(&url[..host_start + path_start]),
        None => Some(url),
    }
}

/// Link filter: same origin as the page, absolute, and not a self-link.
pub(crate) fn link_passes(page_url: &str, link: &str) -> bool {
    if link == page_url {
        return false;
    }
    match (origin(page_url), origin(link)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[async_trait]
impl Worker for CrawlerWorker {
    fn worker_type(&self) -> &str {
        "crawler_url"
    }

    fn validate(&self, job: &Job) -> Result<(), EngineError> {
        require_payload_str(job, "url").map(|_| ())
    }

    async fn execute(&self, ctx: &WorkerContext) -> Result<serde_json::Value, EngineError> {
        ctx.checkpoint()?;
        let url = require_payload_str(&ctx.job, "url")?;
        let max_depth = ctx.job.payload.get("max_depth").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        let auth_id = ctx.job.payload.get("auth_id").and_then(|v| v.as_str());

        let page = self.fetcher.fetch(url, auth_id).await?;
        ctx.checkpoint()?;

        // The URL is the document key: re-crawls update in place
        let document_id = url.to_string();
        let created = self
            .documents
            .upsert(Document {
                id: document_id.clone(),
                source_url: Some(url.to_string()),
                title: page.title.clone(),
                content_markdown: page.content_markdown.clone(),
                metadata: serde_json::Map::new(),
            })
            .await?;
        ctx.publish(Event::DocumentSaved {
            document_id: document_id.clone(),
            timestamp_ms: ctx.now_ms(),
        });
        ctx.log(
            LogLevel::Info,
            format!(
                "stored document for {url} ({})",
                if created { "new" } else { "updated" }
            ),
        );

        let mut spawned = 0u64;
        if ctx.depth < max_depth {
            for link in &page.links {
                if !link_passes(url, link) {
                    continue;
                }
                // Already-stored targets were crawled (or are being
                // crawled); skip to keep recursion bounded
                if self.documents.get(link).await?.is_some() {
                    continue;
                }
                ctx.checkpoint()?;
                let payload = serde_json::json!({
                    "url": link,
                    "max_depth": max_depth,
                    "auth_id": auth_id,
                });
                let mut seed = JobSeed::new(link.clone(), "crawler_url").payload(payload);
                if let Some(definition_id) = &ctx.job.definition_id {
                    seed = seed.definition(definition_id.clone());
                }
                ctx.spawn_child(seed, Some(link))?;
                spawned += 1;
            }
        }

        ctx.publish(Event::CrawlProgress {
            job_id: ctx.job.id.clone(),
            stats: CrawlStats {
                pages_visited: 1,
                links_discovered: page.links.len() as u64,
                documents_saved: 1,
            },
            timestamp_ms: ctx.now_ms(),
        });

        Ok(serde_json::json!({
            "url": url,
            "document_id": document_id,
            "links_discovered": page.links.len(),
            "children_spawned": spawned,
        }))
    }
}
