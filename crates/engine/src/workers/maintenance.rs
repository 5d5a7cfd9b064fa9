// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maintenance worker: housekeeping against the persistence layer.

use super::require_payload_str;
use crate::error::EngineError;
use crate::worker::{Worker, WorkerContext};
use async_trait::async_trait;
use quaero_adapters::{DocumentStore, SearchIndex};
use quaero_core::{Job, LogLevel};
use std::sync::Arc;

pub struct MaintenanceWorker {
    documents: Arc<dyn DocumentStore>,
    index: Arc<dyn SearchIndex>,
}

impl MaintenanceWorker {
    pub fn new(documents: Arc<dyn DocumentStore>, index: Arc<dyn SearchIndex>) -> Self {
        Self { documents, index }
    }
}

#[async_trait]
impl Worker for MaintenanceWorker {
    fn worker_type(&self) -> &str {
        "database_maintenance"
    }

    fn validate(&self, job: &Job) -> Result<(), EngineError> {
        require_payload_str(job, "operation").map(|_| ())
    }

    async fn execute(&self, ctx: &WorkerContext) -> Result<serde_json::Value, EngineError> {
        ctx.checkpoint()?;
        let operation = require_payload_str(&ctx.job, "operation")?;

        let detail = match operation {
            "compact_documents" => {
                self.documents.compact().await?;
                serde_json::Value::Null
            }
            "reindex_search" => {
                let indexed = self.index.reindex_all().await?;
                serde_json::json!({ "documents_indexed": indexed })
            }
            "compact_wal" => {
                ctx.compact_storage()?;
                serde_json::Value::Null
            }
            other => {
                return Err(EngineError::Validation(format!(
                    "unknown maintenance operation '{other}'"
                )))
            }
        };
        ctx.log(LogLevel::Info, format!("maintenance '{operation}' done"));

        Ok(serde_json::json!({ "operation": operation, "detail": detail }))
    }
}
