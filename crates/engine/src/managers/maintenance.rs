// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database-maintenance step manager: one child per operation.

use super::{create_step_parent, Manager};
use crate::error::EngineError;
use crate::services::Services;
use async_trait::async_trait;
use quaero_core::{JobId, JobSeed};
use quaero_definition::{JobDefinition, StepDef};

/// Operations run when the step names none.
const DEFAULT_OPERATIONS: &[&str] = &["compact_documents", "compact_wal"];

pub struct MaintenanceManager {
    services: Services,
}

impl MaintenanceManager {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Manager for MaintenanceManager {
    fn manager_type(&self) -> &str {
        "database_maintenance"
    }

    async fn create_parent_job(
        &self,
        step: &StepDef,
        definition: &JobDefinition,
        root_id: &JobId,
        step_index: usize,
    ) -> Result<JobId, EngineError> {
        let parent = create_step_parent(&self.services, step, definition, root_id, step_index)?;
        let mut operations = step.config_str_list("operations");
        if operations.is_empty() {
            operations = DEFAULT_OPERATIONS.iter().map(|s| s.to_string()).collect();
        }

        for operation in &operations {
            let seed = JobSeed::new(operation.clone(), "database_maintenance")
                .definition(definition.id.clone())
                .payload(serde_json::json!({ "operation": operation }));
            self.services.spawn_child_job(&parent.id, seed, 0, None)?;
        }
        self.services
            .progress(&parent.id, 0, operations.len() as u64)?;
        Ok(parent.id)
    }
}
