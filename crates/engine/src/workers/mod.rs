// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue consumers, one per job type.

mod agent;
mod crawler;
mod maintenance;

pub use agent::AgentWorker;
pub use crawler::CrawlerWorker;
pub use maintenance::MaintenanceWorker;

use crate::error::EngineError;
use quaero_core::Job;

/// Payload field as a non-empty string, or a validation error.
pub(crate) fn require_payload_str<'a>(job: &'a Job, key: &str) -> Result<&'a str, EngineError> {
    job.payload
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            EngineError::Validation(format!(
                "job {} payload missing string field '{key}'",
                job.id
            ))
        })
}

#[cfg(test)]
#[path = "workers_tests.rs"]
mod tests;
