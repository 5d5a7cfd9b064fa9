// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Definition file model.

use crate::duration::parse_duration;
use crate::error::DefinitionError;
use crate::vars;
use quaero_core::ErrorTolerance;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

fn default_true() -> bool {
    true
}

/// Per-step policy when the step's parent job ends up failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the definition run.
    #[default]
    Fail,
    /// Move on to the next step.
    Continue,
    /// Re-run the step once more, then treat a repeat failure as `fail`.
    Retry,
}

quaero_core::simple_display! {
    ErrorPolicy {
        Fail => "fail",
        Continue => "continue",
        Retry => "retry",
    }
}

/// One entry of a definition's ordered step list.
///
/// `action` routes the step to a manager; `config` is free-form and is
/// interpreted by that manager alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
    pub name: String,
    pub action: String,
    #[serde(default)]
    pub on_error: ErrorPolicy,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl StepDef {
    /// String value from the step config.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }

    /// Unsigned integer value from the step config.
    pub fn config_u64(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(|v| v.as_u64())
    }

    /// String-array value from the step config.
    pub fn config_str_list(&self, key: &str) -> Vec<String> {
        self.config
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A user-declared job definition: metadata, ordered steps, tolerance.
///
/// Not a record of any execution — executing one produces a job tree in
/// the job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Classification tag, e.g. "crawl" or "maintenance".
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Cron-like expression; empty means manual-only.
    #[serde(default)]
    pub schedule: String,
    /// Max execution time as a duration string (`30s`, `5m`, `2h`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_id: Option<String>,
    /// Definition ids to run before / after this one.
    #[serde(default)]
    pub pre_jobs: Vec<String>,
    #[serde(default)]
    pub post_jobs: Vec<String>,
    pub steps: Vec<StepDef>,
    #[serde(default)]
    pub error_tolerance: ErrorTolerance,
}

impl JobDefinition {
    /// Parse one definition from TOML text.
    pub fn parse(text: &str) -> Result<Self, DefinitionError> {
        let mut def: JobDefinition = toml::from_str(text)?;
        if def.name.is_empty() {
            def.name = def.id.clone();
        }
        def.validate()?;
        Ok(def)
    }

    fn invalid(&self, reason: impl Into<String>) -> DefinitionError {
        DefinitionError::Invalid {
            id: self.id.clone(),
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.id.trim().is_empty() {
            return Err(self.invalid("empty id"));
        }
        if self.steps.is_empty() {
            return Err(self.invalid("no steps"));
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(self.invalid(format!("step {index} has no name")));
            }
            if step.action.trim().is_empty() {
                return Err(self.invalid(format!("step '{}' has no action", step.name)));
            }
        }
        if let Some(timeout) = &self.timeout {
            parse_duration(timeout)
                .map_err(|e| self.invalid(format!("bad timeout: {e}")))?;
        }
        Ok(())
    }

    /// Parsed execution timeout, if configured.
    pub fn timeout_duration(&self) -> Option<Duration> {
        // Validated at parse time; a bad string is unreachable here
        self.timeout
            .as_deref()
            .and_then(|t| parse_duration(t).ok())
    }

    /// Copy of the definition with `{key}` tokens substituted from `vars`
    /// in its string fields (name, description, base_url, auth_id, tags)
    /// and every step config. Missing keys are logged as warnings and
    /// left as-is.
    pub fn resolve(&self, variables: &HashMap<String, String>) -> JobDefinition {
        let mut resolved = self.clone();
        resolved.name = vars::substitute(&self.name, variables);
        resolved.description = vars::substitute(&self.description, variables);
        resolved.base_url = self
            .base_url
            .as_deref()
            .map(|url| vars::substitute(url, variables));
        resolved.auth_id = self
            .auth_id
            .as_deref()
            .map(|id| vars::substitute(id, variables));
        resolved.tags = self
            .tags
            .iter()
            .map(|tag| vars::substitute(tag, variables))
            .collect();
        for step in &mut resolved.steps {
            step.config = vars::substitute_value(&step.config, variables);
        }
        resolved
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
