// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `quaerod` daemon: process shell around `quaero-engine`.
//!
//! Env-driven settings, tracing with a file appender, a crash handler
//! that dumps stack traces to `logs/`, default production collaborators,
//! and a unix-socket listener speaking the `quaero-wire` protocol.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod collaborators;
pub mod crash;
pub mod env;
pub mod listener;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Engine(#[from] quaero_engine::EngineError),

    #[error(transparent)]
    Definition(#[from] quaero_definition::DefinitionError),
}
