// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Places-search step manager.
//!
//! Synchronous: queries the places API and stores each result as a keyed
//! document (`place:{id}` — repeat searches update, never duplicate).

use super::{complete_parent, create_step_parent, fail_parent, Manager};
use crate::error::EngineError;
use crate::services::Services;
use async_trait::async_trait;
use quaero_adapters::{Document, DocumentStore, PlacesClient};
use quaero_core::{Clock, Event, JobId};
use quaero_definition::{JobDefinition, StepDef};
use std::sync::Arc;

const DEFAULT_MAX_RESULTS: u64 = 20;

pub struct PlacesSearchManager {
    services: Services,
    places: Arc<dyn PlacesClient>,
    documents: Arc<dyn DocumentStore>,
}

impl PlacesSearchManager {
    pub fn new(
        services: Services,
        places: Arc<dyn PlacesClient>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            services,
            places,
            documents,
        }
    }

    async fn run(&self, step: &StepDef) -> Result<u64, EngineError> {
        let query = step
            .config_str("query")
            .ok_or_else(|| EngineError::Validation("places_search step requires config.query".to_string()))?;
        let max_results = step
            .config_u64("max_results")
            .unwrap_or(DEFAULT_MAX_RESULTS) as usize;

        let places = self.places.search(query, max_results).await?;
        let now = self.services.clock.epoch_ms();
        for place in &places {
            let document_id = format!("place:{}", place.id);
            let mut metadata = serde_json::Map::new();
            metadata.insert("place".to_string(), serde_json::to_value(place)?);
            self.documents
                .upsert(Document {
                    id: document_id.clone(),
                    source_url: None,
                    title: place.name.clone(),
                    content_markdown: format!("# {}\n\n{}", place.name, place.address),
                    metadata,
                })
                .await?;
            self.services.bus.publish(Event::DocumentSaved {
                document_id,
                timestamp_ms: now,
            });
        }
        Ok(places.len() as u64)
    }
}

#[async_trait]
impl Manager for PlacesSearchManager {
    fn manager_type(&self) -> &str {
        "places_search"
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
                    serde_json::json!({ "places_found": count }),
                )?;
            }
            Err(e) => fail_parent(&self.services, &parent.id, &e),
        }
        Ok(parent.id)
    }
}
