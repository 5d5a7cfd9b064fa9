// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document shape exchanged with the document store.

use serde::{Deserialize, Serialize};

/// One stored document.
///
/// `id` is the store's stable key — for crawled pages it is derived from
/// the URL, which is what makes re-crawling idempotent (an update, not a
/// duplicate).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content_markdown: String,
    /// Free-form per-agent annotations under `metadata[agent_type]`.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Selection filter for building agent work sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFilter {
    /// Only documents whose source URL starts with this prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_prefix: Option<String>,
    /// Only documents missing this metadata key (not yet processed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_metadata: Option<String>,
}

impl DocumentFilter {
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(prefix) = &self.url_prefix {
            let Some(url) = &doc.source_url else {
                return false;
            };
            if !url.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(key) = &self.missing_metadata {
            if doc.metadata.contains_key(key) {
                return false;
            }
        }
        true
    }
}
