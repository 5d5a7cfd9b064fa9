// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types published on the in-process bus.
//!
//! Serializes with `{"type": "kind:name", ...fields}` format so connected
//! UI clients can multiplex on the tag. Fan-out is best-effort: nothing is
//! persisted and there is no replay.

use crate::id::JobId;
use crate::job::JobStatus;
use crate::log::LogLevel;
use crate::message::QueueStats;
use serde::{Deserialize, Serialize};

/// Periodic crawler counters attached to `crawl:progress`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub pages_visited: u64,
    pub links_discovered: u64,
    pub documents_saved: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "crawl:progress")]
    CrawlProgress {
        job_id: JobId,
        stats: CrawlStats,
        timestamp_ms: u64,
    },

    #[serde(rename = "job:progress")]
    JobProgress {
        job_id: JobId,
        current: u64,
        total: u64,
        timestamp_ms: u64,
    },

    #[serde(rename = "job:log")]
    JobLog {
        job_id: JobId,
        level: LogLevel,
        message: String,
        timestamp_ms: u64,
    },

    /// A worker or manager created and enqueued a child job.
    #[serde(rename = "job:spawn")]
    JobSpawned {
        parent_job_id: JobId,
        child_job_id: JobId,
        job_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default)]
        depth: u32,
        timestamp_ms: u64,
    },

    #[serde(rename = "job:status_changed")]
    StatusChanged {
        job_id: JobId,
        old: JobStatus,
        new: JobStatus,
        timestamp_ms: u64,
    },

    #[serde(rename = "document:saved")]
    DocumentSaved {
        document_id: String,
        timestamp_ms: u64,
    },

    #[serde(rename = "document:updated")]
    DocumentUpdated {
        document_id: String,
        timestamp_ms: u64,
    },

    /// Broadcast on the 5-second stats ticker.
    #[serde(rename = "queue:stats")]
    QueueStats {
        stats: QueueStats,
        timestamp_ms: u64,
    },
}

impl Event {
    /// One-line summary for trace logging.
    pub fn log_summary(&self) -> String {
        match self {
            Event::CrawlProgress { job_id, stats, .. } => format!(
                "crawl:progress job={} visited={} saved={}",
                job_id.short(8),
                stats.pages_visited,
                stats.documents_saved
            ),
            Event::JobProgress {
                job_id,
                current,
                total,
                ..
            } => format!("job:progress job={} {current}/{total}", job_id.short(8)),
            Event::JobLog { job_id, level, .. } => {
                format!("job:log job={} level={level}", job_id.short(8))
            }
            Event::JobSpawned {
                parent_job_id,
                child_job_id,
                job_type,
                depth,
                ..
            } => format!(
                "job:spawn parent={} child={} type={job_type} depth={depth}",
                parent_job_id.short(8),
                child_job_id.short(8)
            ),
            Event::StatusChanged {
                job_id, old, new, ..
            } => format!("job:status_changed job={} {old}->{new}", job_id.short(8)),
            Event::DocumentSaved { document_id, .. } => {
                format!("document:saved id={document_id}")
            }
            Event::DocumentUpdated { document_id, .. } => {
                format!("document:updated id={document_id}")
            }
            Event::QueueStats { stats, .. } => format!(
                "queue:stats pending={} in_flight={}",
                stats.pending, stats.in_flight
            ),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
