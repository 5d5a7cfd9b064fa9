// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Responses and streamed frames sent back to clients.

use crate::types::JobSummary;
use quaero_core::{Event, Job, JobLogEntry, QueueStats, TreeStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Definition run accepted and queued.
    Executed { job_id: String, status: String },

    Jobs { jobs: Vec<JobSummary> },

    Job { job: Job },

    Children { children: Vec<JobSummary> },

    Logs { entries: Vec<JobLogEntry> },

    Tree { tree: TreeStatus },

    Queue { stats: QueueStats },

    Definitions { ids: Vec<String> },

    /// Acknowledges a `Subscribe`; `Event` frames follow.
    Subscribed,

    Event { event: Event },

    Ok,

    Error { message: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
