// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests a client can send to the daemon.

use serde::{Deserialize, Serialize};

fn default_limit() -> usize {
    50
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Trigger a definition run; answered with `Executed` immediately.
    Execute { definition_id: String },

    /// Root jobs (no parent), newest first, paginated.
    ListJobs {
        #[serde(default)]
        offset: usize,
        #[serde(default = "default_limit")]
        limit: usize,
    },

    GetJob { id: String },

    ListChildren { id: String },

    ListLogs {
        id: String,
        #[serde(default = "default_limit")]
        limit: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        since_ms: Option<u64>,
    },

    /// Derived tree aggregate for a parent job.
    TreeStatus { id: String },

    CancelJob { id: String },

    /// Fresh pending root with the same payload.
    CopyJob { id: String },

    DeleteJob { id: String },

    QueueStatus,

    ListDefinitions,

    /// Switch this connection to a stream of `Event` responses.
    Subscribe,

    Shutdown,
}
