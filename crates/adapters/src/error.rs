// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborator error taxonomy. Transient vs. permanent is the caller's
//! judgement; adapters only report what happened.

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("agent call failed: {0}")]
    AgentFailed(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}
