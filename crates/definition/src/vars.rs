// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{key-name}` variable substitution.
//!
//! Tokens are resolved against the process-wide variables map before a
//! definition is used. Missing keys are logged as warnings and the token
//! is left unsubstituted so the gap is visible downstream.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_-]*)\}").expect("constant regex pattern is valid")
});

/// Substitute `{key}` tokens in one string.
pub fn substitute(template: &str, variables: &HashMap<String, String>) -> String {
    TOKEN_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            let key = &caps[1];
            match variables.get(key) {
                Some(value) => value.clone(),
                None => {
                    tracing::warn!(key, "variable not found, token left unsubstituted");
                    caps[0].to_string()
                }
            }
        })
        .to_string()
}

/// Substitute tokens through a JSON tree: every string leaf is processed,
/// object keys and non-string leaves are untouched.
pub fn substitute_value(
    value: &serde_json::Value,
    variables: &HashMap<String, String>,
) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(substitute(s, variables)),
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items.iter().map(|v| substitute_value(v, variables)).collect(),
        ),
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_value(v, variables)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
