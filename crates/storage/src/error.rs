// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error taxonomy.

use quaero_core::TransitionError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("parent job not found: {0}")]
    ParentNotFound(String),

    #[error("job {job_id} is terminal; progress updates rejected")]
    TerminalJob { job_id: String },

    #[error("progress regression on {job_id}: current {current} -> {requested}")]
    ProgressRegression {
        job_id: String,
        current: u64,
        requested: u64,
    },

    #[error("progress {current} exceeds total {total} on {job_id}")]
    ProgressBeyondTotal {
        job_id: String,
        current: u64,
        total: u64,
    },

    #[error("stale receipt for message {0}")]
    StaleReceipt(String),
}
