// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loading a directory of definition files.

use crate::error::DefinitionError;
use crate::model::JobDefinition;
use indexmap::IndexMap;
use std::path::Path;

/// All definitions known to the process, keyed by id in load order.
#[derive(Debug, Default, Clone)]
pub struct DefinitionSet {
    definitions: IndexMap<String, JobDefinition>,
}

impl DefinitionSet {
    /// Parse every `*.toml` file in `dir`, sorted by file name.
    ///
    /// Files that fail to parse or validate are logged and skipped — one
    /// broken definition never takes the daemon down. A duplicate id
    /// keeps the first occurrence.
    pub fn load_dir(dir: &Path) -> Result<Self, DefinitionError> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        let mut set = Self::default();
        for path in paths {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable definition file");
                    continue;
                }
            };
            match JobDefinition::parse(&text) {
                Ok(def) => {
                    if set.definitions.contains_key(&def.id) {
                        tracing::warn!(path = %path.display(), id = %def.id, "duplicate definition id, keeping first");
                        continue;
                    }
                    tracing::debug!(id = %def.id, steps = def.steps.len(), "loaded definition");
                    set.definitions.insert(def.id.clone(), def);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping invalid definition file");
                }
            }
        }
        tracing::info!(count = set.definitions.len(), dir = %dir.display(), "definitions loaded");
        Ok(set)
    }

    pub fn insert(&mut self, def: JobDefinition) {
        self.definitions.insert(def.id.clone(), def);
    }

    pub fn get(&self, id: &str) -> Option<&JobDefinition> {
        self.definitions.get(id)
    }

    pub fn require(&self, id: &str) -> Result<&JobDefinition, DefinitionError> {
        self.get(id)
            .ok_or_else(|| DefinitionError::NotFound(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
#[path = "set_tests.rs"]
mod tests;
