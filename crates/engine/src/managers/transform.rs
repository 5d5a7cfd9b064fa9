// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transform step manager.
//!
//! Synchronous: normalizes matching documents inline and returns an
//! already-completed parent — no children, no queue traffic.

use super::{complete_parent, create_step_parent, fail_parent, Manager};
use crate::error::EngineError;
use crate::services::Services;
use async_trait::async_trait;
use quaero_adapters::{DocumentFilter, DocumentStore};
use quaero_core::{Clock, Event, JobId};
use quaero_definition::{JobDefinition, StepDef};
use std::sync::Arc;

const METADATA_KEY: &str = "transform";

pub struct TransformManager {
    services: Services,
    documents: Arc<dyn DocumentStore>,
}

impl TransformManager {
    pub fn new(services: Services, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            services,
            documents,
        }
    }

    async fn run(&self, step: &StepDef) -> Result<u64, EngineError> {
        let filter = DocumentFilter {
            url_prefix: step.config_str("url_prefix").map(str::to_string),
            missing_metadata: Some(METADATA_KEY.to_string()),
        };
        let ids = self.documents.find_ids(&filter).await?;
        let now = self.services.clock.epoch_ms();
        for id in &ids {
            self.documents
                .set_metadata(id, METADATA_KEY, serde_json::json!({ "at_ms": now }))
                .await?;
            self.services.bus.publish(Event::DocumentUpdated {
                document_id: id.clone(),
                timestamp_ms: now,
            });
        }
        Ok(ids.len() as u64)
    }
}

#[async_trait]
impl Manager for TransformManager {
    fn manager_type(&self) -> &str {
        "transform"
    }

    async fn create_parent_job(
        &self,
        step: &StepDef,
        definition: &JobDefinition,
        root_id: &JobId,
        step_index: usize,
    ) -> Result<JobId, EngineError> {
        let parent = create_step_parent(&self.services, step, definition, root_id, step_index)?;
        match self.run(step).await {
            Ok(count) => {
                complete_parent(
                    &self.services,
                    &parent.id,
                    serde_json::json!({ "documents_transformed": count }),
                )?;
            }
            Err(e) => fail_parent(&self.services, &parent.id, &e),
        }
        Ok(parent.id)
    }
}
