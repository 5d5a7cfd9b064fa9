// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent worker: run one AI agent over one document.

use super::require_payload_str;
use crate::error::EngineError;
use crate::worker::{Worker, WorkerContext};
use async_trait::async_trait;
use quaero_adapters::{AgentClient, DocumentStore};
use quaero_core::{Event, Job, LogLevel};
use std::sync::Arc;

pub struct AgentWorker {
    documents: Arc<dyn DocumentStore>,
    agents: Arc<dyn AgentClient>,
}

impl AgentWorker {
    pub fn new(documents: Arc<dyn DocumentStore>, agents: Arc<dyn AgentClient>) -> Self {
        Self { documents, agents }
    }
}

#[async_trait]
impl Worker for AgentWorker {
    fn worker_type(&self) -> &str {
        "agent"
    }

    fn validate(&self, job: &Job) -> Result<(), EngineError> {
        require_payload_str(job, "document_id")?;
        require_payload_str(job, "agent_type")?;
        Ok(())
    }

    async fn execute(&self, ctx: &WorkerContext) -> Result<serde_json::Value, EngineError> {
        ctx.checkpoint()?;
        let document_id = require_payload_str(&ctx.job, "document_id")?;
        let agent_type = require_payload_str(&ctx.job, "agent_type")?;

        let document = self
            .documents
            .get(document_id)
            .await?
            .ok_or_else(|| EngineError::Execution(format!("document not found: {document_id}")))?;

        let annotation = self.agents.run(agent_type, &document).await?;
        ctx.checkpoint()?;

        self.documents
            .set_metadata(document_id, agent_type, annotation.clone())
            .await?;
        ctx.publish(Event::DocumentUpdated {
            document_id: document_id.to_string(),
            timestamp_ms: ctx.now_ms(),
        });
        ctx.log(
            LogLevel::Info,
            format!("agent '{agent_type}' annotated {document_id}"),
        );

        Ok(serde_json::json!({
            "document_id": document_id,
            "agent_type": agent_type,
            "annotation": annotation,
        }))
    }
}
