// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent step manager: one `agent` child per matching document.

use super::{create_step_parent, fail_parent, Manager};
use crate::error::EngineError;
use crate::services::Services;
use async_trait::async_trait;
use quaero_adapters::{DocumentFilter, DocumentStore};
use quaero_core::{JobId, JobSeed, LogLevel};
use quaero_definition::{JobDefinition, StepDef};
use std::sync::Arc;

pub struct AgentManager {
    services: Services,
    documents: Arc<dyn DocumentStore>,
}

impl AgentManager {
    pub fn new(services: Services, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            services,
            documents,
        }
    }
}

#[async_trait]
impl Manager for AgentManager {
    fn manager_type(&self) -> &str {
        "agent"
    }

    async fn create_parent_job(
        &self,
        step: &StepDef,
        definition: &JobDefinition,
        root_id: &JobId,
        step_index: usize,
    ) -> Result<JobId, EngineError> {
        let parent = create_step_parent(&self.services, step, definition, root_id, step_index)?;

        let Some(agent_type) = step.config_str("agent_type") else {
            let err = EngineError::Validation("agent step requires config.agent_type".to_string());
            fail_parent(&self.services, &parent.id, &err);
            return Ok(parent.id);
        };

        // Work set: documents not yet annotated by this agent type
        let filter = DocumentFilter {
            url_prefix: step.config_str("url_prefix").map(str::to_string),
            missing_metadata: Some(agent_type.to_string()),
        };
        let ids = match self.documents.find_ids(&filter).await {
            Ok(ids) => ids,
            Err(e) => {
                fail_parent(&self.services, &parent.id, &e.into());
                return Ok(parent.id);
            }
        };

        for document_id in &ids {
            let payload = serde_json::json!({
                "document_id": document_id,
                "agent_type": agent_type,
            });
            let seed = JobSeed::new(format!("{agent_type}: {document_id}"), "agent")
                .definition(definition.id.clone())
                .payload(payload);
            self.services.spawn_child_job(&parent.id, seed, 0, None)?;
        }
        self.services.progress(&parent.id, 0, ids.len() as u64)?;
        self.services.log(
            &parent.id,
            LogLevel::Info,
            format!("enqueued {} documents for agent '{agent_type}'", ids.len()),
        )?;
        Ok(parent.id)
    }
}
