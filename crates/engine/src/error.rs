// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy (spec kinds: transient I/O, validation,
//! execution, panic, routing, cancellation, tolerance breach).

use quaero_adapters::AdapterError;
use quaero_definition::DefinitionError;
use quaero_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("no worker registered for type '{0}'")]
    NoWorker(String),

    #[error("no manager registered for action '{0}'")]
    NoManager(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("worker panicked: {0}")]
    Panicked(String),

    #[error("cancelled")]
    Cancelled,

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl EngineError {
    /// Worker observed a cancellation rather than a real failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}
