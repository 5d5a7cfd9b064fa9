// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker and manager registries.
//!
//! Plain maps from routing tag to implementation — new job types and step
//! actions are plug-ins, not subclasses.

use crate::managers::Manager;
use crate::worker::Worker;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under `worker.worker_type()`. A duplicate type overwrites
    /// the previous registration with a warning.
    pub fn register(&mut self, worker: Arc<dyn Worker>) {
        let worker_type = worker.worker_type().to_string();
        if self.workers.insert(worker_type.clone(), worker).is_some() {
            tracing::warn!(worker_type, "worker type re-registered, previous implementation replaced");
        }
    }

    pub fn get(&self, worker_type: &str) -> Option<Arc<dyn Worker>> {
        self.workers.get(worker_type).cloned()
    }

    pub fn types(&self) -> Vec<&str> {
        self.workers.keys().map(String::as_str).collect()
    }
}

#[derive(Default)]
pub struct ManagerRegistry {
    managers: HashMap<String, Arc<dyn Manager>>,
}

impl ManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, manager: Arc<dyn Manager>) {
        let manager_type = manager.manager_type().to_string();
        if self.managers.insert(manager_type.clone(), manager).is_some() {
            tracing::warn!(manager_type, "manager type re-registered, previous implementation replaced");
        }
    }

    pub fn get(&self, manager_type: &str) -> Option<Arc<dyn Manager>> {
        self.managers.get(manager_type).cloned()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
