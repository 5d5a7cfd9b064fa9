// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Definition loading and validation errors.

#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid definition '{id}': {reason}")]
    Invalid { id: String, reason: String },

    #[error("invalid duration '{0}': expected forms like 500ms, 30s, 5m, 2h")]
    InvalidDuration(String),

    #[error("definition not found: {0}")]
    NotFound(String),
}
