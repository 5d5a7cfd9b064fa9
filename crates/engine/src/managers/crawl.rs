// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crawl step manager: one `crawler_url` child per seed URL.

use super::{create_step_parent, Manager};
use crate::error::EngineError;
use crate::services::Services;
use async_trait::async_trait;
use quaero_core::{JobId, JobSeed, LogLevel};
use quaero_definition::{JobDefinition, StepDef};

const DEFAULT_MAX_DEPTH: u64 = 1;

pub struct CrawlManager {
    services: Services,
}

impl CrawlManager {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Seed URLs from step config, falling back to the definition's
    /// base_url.
    fn seeds(step: &StepDef, definition: &JobDefinition) -> Vec<String> {
        let configured = step.config_str_list("seeds");
        if !configured.is_empty() {
            return configured;
        }
        definition.base_url.iter().cloned().collect()
    }
}

#[async_trait]
impl Manager for CrawlManager {
    fn manager_type(&self) -> &str {
        "crawl"
    }

    async fn create_parent_job(
        &self,
        step: &StepDef,
        definition: &JobDefinition,
        root_id: &JobId,
        step_index: usize,
    ) -> Result<JobId, EngineError> {
        let parent = create_step_parent(&self.services, step, definition, root_id, step_index)?;
        let seeds = Self::seeds(step, definition);
        let max_depth = step.config_u64("max_depth").unwrap_or(DEFAULT_MAX_DEPTH);

        if seeds.is_empty() {
            self.services.log(
                &parent.id,
                LogLevel::Warn,
                "crawl step has no seeds and no base_url; nothing to do",
            )?;
            return Ok(parent.id);
        }

        for url in &seeds {
            let payload = serde_json::json!({
                "url": url,
                "max_depth": max_depth,
                "auth_id": definition.auth_id,
            });
            let seed = JobSeed::new(url.clone(), "crawler_url")
                .definition(definition.id.clone())
                .payload(payload);
            self.services
                .spawn_child_job(&parent.id, seed, 0, Some(url))?;
        }
        self.services.progress(&parent.id, 0, seeds.len() as u64)?;
        self.services.log(
            &parent.id,
            LogLevel::Info,
            format!("enqueued {} seed urls (max_depth {max_depth})", seeds.len()),
        )?;
        Ok(parent.id)
    }
}
