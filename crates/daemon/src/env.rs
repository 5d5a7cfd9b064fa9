// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon settings from the environment.
//!
//! `QUAERO_VAR_<NAME>` entries seed the process-wide variables map; the
//! variable name is lowercased with underscores turned into hyphens
//! (`QUAERO_VAR_SITE_NAME` → `{site-name}`).

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_STATE_DIR: &str = "state";
const DEFAULT_DEFINITIONS_DIR: &str = "definitions";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_SOCKET: &str = "quaero.sock";

#[derive(Debug, Clone)]
pub struct Settings {
    pub state_dir: PathBuf,
    pub definitions_dir: PathBuf,
    pub log_dir: PathBuf,
    pub socket_path: PathBuf,
    pub concurrency: u32,
    pub visibility_timeout: Duration,
    pub variables: HashMap<String, String>,
}

impl Settings {
    pub fn from_env() -> Self {
        let string = |key: &str, default: &str| {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };
        let concurrency = std::env::var("QUAERO_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(5);
        let visibility_secs = std::env::var("QUAERO_VISIBILITY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(300);

        Self {
            state_dir: string("QUAERO_STATE_DIR", DEFAULT_STATE_DIR).into(),
            definitions_dir: string("QUAERO_DEFINITIONS_DIR", DEFAULT_DEFINITIONS_DIR).into(),
            log_dir: string("QUAERO_LOG_DIR", DEFAULT_LOG_DIR).into(),
            socket_path: string("QUAERO_SOCKET", DEFAULT_SOCKET).into(),
            concurrency,
            visibility_timeout: Duration::from_secs(visibility_secs),
            variables: variables_from_env(std::env::vars()),
        }
    }
}

fn variables_from_env(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.filter_map(|(key, value)| {
        key.strip_prefix("QUAERO_VAR_")
            .map(|name| (name.to_lowercase().replace('_', "-"), value))
    })
    .collect()
}
