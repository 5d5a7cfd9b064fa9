// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue message and queue statistics.

use crate::id::{JobId, MessageId};
use crate::job::Job;
use serde::{Deserialize, Serialize};

/// The only shape placed on the queue.
///
/// Routing is by `job_type`; `depth` tracks the nesting level of recursive
/// spawns (crawler link discovery); `parent_id` mirrors the job record for
/// convenience so consumers avoid a store lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: MessageId,
    pub job_id: JobId,
    pub job_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<JobId>,
    pub enqueued_at_ms: u64,
}

impl QueueMessage {
    /// Message for a freshly created job record.
    pub fn for_job(job: &Job, depth: u32, now_ms: u64) -> Self {
        Self {
            id: MessageId::generate(),
            job_id: job.id.clone(),
            job_type: job.job_type.clone(),
            payload: job.payload.clone(),
            depth,
            parent_id: job.parent_id.clone(),
            enqueued_at_ms: now_ms,
        }
    }
}

/// Point-in-time queue counters, broadcast on the stats ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub name: String,
    pub total: u64,
    pub pending: u64,
    pub in_flight: u64,
    pub concurrency: u32,
}
