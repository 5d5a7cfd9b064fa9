// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide variables for `{key}` substitution in definitions.
//!
//! Initialized once at startup and read by the orchestrator when it
//! resolves a definition for execution.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct VariableStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(values: HashMap<String, String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(values)),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.write().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    /// Copy of the current map, for substitution passes.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
