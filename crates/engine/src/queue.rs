// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Async facade over the durable queue store.
//!
//! `receive` suspends cooperatively on a bounded poll until a message is
//! available or the caller's token fires — an idle pool never spins hot.
//! `delete` is deliberately detached from the receive context and bounded
//! by its own short deadline: a receive deadline elapsing during a long
//! execution must never prevent the final delete (the historical
//! redelivery-storm bug).

use crate::error::EngineError;
use quaero_core::{Clock, QueueMessage, QueueStats, SharedClock};
use quaero_storage::{QueueStore, Receipt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DELETE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct QueueManager {
    store: QueueStore,
    clock: SharedClock,
    visibility_timeout: Duration,
    poll_interval: Duration,
}

impl QueueManager {
    pub fn new(
        store: QueueStore,
        clock: SharedClock,
        visibility_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            visibility_timeout,
            poll_interval,
        }
    }

    /// Append a message. Durable before return; never blocks on consumers.
    pub fn enqueue(&self, message: QueueMessage) -> Result<(), EngineError> {
        tracing::debug!(message_id = %message.id, job_id = %message.job_id, job_type = %message.job_type, "enqueue");
        self.store.push(message)?;
        Ok(())
    }

    /// Claim the next message, blocking until one is available or `cancel`
    /// fires.
    pub async fn receive(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(QueueMessage, Receipt), EngineError> {
        loop {
            if let Some(claimed) = self
                .store
                .claim_next(self.clock.epoch_ms(), self.visibility_timeout.as_millis() as u64)
            {
                return Ok(claimed);
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Push the visibility deadline of a claimed message forward.
    pub fn extend(&self, receipt: &Receipt, duration: Duration) -> Result<(), EngineError> {
        self.store
            .extend(receipt, self.clock.epoch_ms(), duration.as_millis() as u64)?;
        Ok(())
    }

    /// Remove a processed message under a fresh 5-second deadline,
    /// independent of whatever context received it.
    pub async fn delete(&self, receipt: &Receipt) -> Result<(), EngineError> {
        let store = self.store.clone();
        let receipt = receipt.clone();
        match tokio::time::timeout(
            DELETE_TIMEOUT,
            tokio::task::spawn_blocking(move || store.remove(&receipt)),
        )
        .await
        {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join)) => Err(EngineError::Execution(format!("delete task failed: {join}"))),
            Err(_) => Err(EngineError::Timeout(DELETE_TIMEOUT)),
        }
    }

    pub fn stats(&self, concurrency: u32) -> QueueStats {
        self.store.stats(self.clock.epoch_ms(), concurrency)
    }

    pub fn visibility_timeout(&self) -> Duration {
        self.visibility_timeout
    }

    /// Snapshot + truncate the backing WAL.
    pub fn compact(&self) -> Result<(), EngineError> {
        self.store.compact()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
