// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reindex step manager. Synchronous: rebuilds the search index inline.

use super::{complete_parent, create_step_parent, fail_parent, Manager};
use crate::error::EngineError;
use crate::services::Services;
use async_trait::async_trait;
use quaero_adapters::SearchIndex;
use quaero_core::JobId;
use quaero_definition::{JobDefinition, StepDef};
use std::sync::Arc;

pub struct ReindexManager {
    services: Services,
    index: Arc<dyn SearchIndex>,
}

impl ReindexManager {
    pub fn new(services: Services, index: Arc<dyn SearchIndex>) -> Self {
        Self { services, index }
    }
}

#[async_trait]
impl Manager for ReindexManager {
    fn manager_type(&self) -> &str {
        "reindex"
    }

    async fn create_parent_job(
        &self,
        step: &StepDef,
        definition: &JobDefinition,
        root_id: &JobId,
        step_index: usize,
    ) -> Result<JobId, EngineError> {
        let parent = create_step_parent(&self.services, step, definition, root_id, step_index)?;
        match self.index.reindex_all().await {
            Ok(indexed) => {
                complete_parent(
                    &self.services,
                    &parent.id,
                    serde_json::json!({ "documents_indexed": indexed }),
                )?;
            }
            Err(e) => fail_parent(&self.services, &parent.id, &e.into()),
        }
        Ok(parent.id)
    }
}
