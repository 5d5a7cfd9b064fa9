// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable FIFO message queue with visibility tracking.
//!
//! Message rows are WAL-persisted; visibility deadlines are in-memory
//! only. A crashed process therefore re-delivers everything that was
//! claimed but never removed — the at-least-once contract. Claims hand
//! out a [`Receipt`] capability; a receipt goes stale the moment its
//! message is re-claimed after visibility expiry, so a slow consumer can
//! never delete work that has been handed to someone else.

use crate::error::StorageError;
use crate::snapshot;
use crate::wal::Wal;
use parking_lot::Mutex;
use quaero_core::{MessageId, QueueMessage, QueueStats};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const WAL_FILE: &str = "queue.wal";
const SNAPSHOT_FILE: &str = "queue.snapshot";

/// WAL record for queue mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueueRecord {
    Pushed { message: QueueMessage },
    Removed { id: MessageId },
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct QueueState {
    /// Arrival order; claim scans front to back.
    messages: Vec<QueueMessage>,
}

impl QueueState {
    fn apply(&mut self, record: &QueueRecord) {
        match record {
            QueueRecord::Pushed { message } => {
                if !self.messages.iter().any(|m| m.id == message.id) {
                    self.messages.push(message.clone());
                }
            }
            QueueRecord::Removed { id } => {
                self.messages.retain(|m| m.id != *id);
            }
        }
    }
}

/// Capability to extend or remove one claimed message.
///
/// The token invalidates stale receipts: a message re-claimed after its
/// visibility lapsed carries a newer token, and operations with the old
/// receipt are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub message_id: MessageId,
    token: u64,
}

#[derive(Debug, Clone, Copy)]
struct Claim {
    token: u64,
    deadline_ms: u64,
}

struct Inner {
    wal: Wal<QueueRecord>,
    snapshot_path: PathBuf,
    state: QueueState,
    /// message id -> live claim. Never persisted.
    claims: HashMap<MessageId, Claim>,
    next_token: u64,
}

/// Handle to the durable queue. Cheap to clone.
#[derive(Clone)]
pub struct QueueStore {
    inner: Arc<Mutex<Inner>>,
    name: String,
}

impl QueueStore {
    /// Open (or create) the queue in `dir`. All claims reset to pending.
    pub fn open(dir: &Path, name: impl Into<String>) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let (snap_seq, mut state) = snapshot::read::<QueueState>(&snapshot_path)?
            .unwrap_or((0, QueueState::default()));
        let (wal, entries) = Wal::open(dir.join(WAL_FILE), snap_seq)?;
        for entry in &entries {
            if entry.seq > snap_seq {
                state.apply(&entry.record);
            }
        }
        tracing::debug!(backlog = state.messages.len(), "queue store opened");
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                wal,
                snapshot_path,
                state,
                claims: HashMap::new(),
                next_token: 1,
            })),
            name: name.into(),
        })
    }

    /// Append a message. Durable before return.
    pub fn push(&self, message: QueueMessage) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        inner.commit(QueueRecord::Pushed { message })?;
        inner.wal.flush()?;
        Ok(())
    }

    /// Claim the next deliverable message, hiding it until
    /// `now_ms + visibility_ms`.
    ///
    /// Messages whose previous claim expired are moved to the back of the
    /// queue first — redelivery loses the original position.
    pub fn claim_next(
        &self,
        now_ms: u64,
        visibility_ms: u64,
    ) -> Option<(QueueMessage, Receipt)> {
        let mut inner = self.inner.lock();
        inner.requeue_expired(now_ms);

        let index = inner
            .state
            .messages
            .iter()
            .position(|m| !inner.claims.contains_key(&m.id))?;
        let message = inner.state.messages[index].clone();
        let token = inner.next_token;
        inner.next_token += 1;
        inner.claims.insert(
            message.id.clone(),
            Claim {
                token,
                deadline_ms: now_ms + visibility_ms,
            },
        );
        let receipt = Receipt {
            message_id: message.id.clone(),
            token,
        };
        Some((message, receipt))
    }

    /// Push the in-flight deadline of a claimed message forward.
    pub fn extend(
        &self,
        receipt: &Receipt,
        now_ms: u64,
        visibility_ms: u64,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        match inner.claims.get_mut(&receipt.message_id) {
            Some(claim) if claim.token == receipt.token => {
                claim.deadline_ms = now_ms + visibility_ms;
                Ok(())
            }
            _ => Err(StorageError::StaleReceipt(receipt.message_id.to_string())),
        }
    }

    /// Remove a claimed message for good. Durable before return.
    pub fn remove(&self, receipt: &Receipt) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        match inner.claims.get(&receipt.message_id) {
            Some(claim) if claim.token == receipt.token => {}
            _ => return Err(StorageError::StaleReceipt(receipt.message_id.to_string())),
        }
        inner.claims.remove(&receipt.message_id);
        inner.commit(QueueRecord::Removed {
            id: receipt.message_id.clone(),
        })?;
        inner.wal.flush()?;
        Ok(())
    }

    /// Point-in-time counters. `concurrency` is supplied by the worker
    /// pool since the store has no notion of consumers.
    pub fn stats(&self, now_ms: u64, concurrency: u32) -> QueueStats {
        let inner = self.inner.lock();
        let total = inner.state.messages.len() as u64;
        let in_flight = inner
            .claims
            .values()
            .filter(|c| c.deadline_ms > now_ms)
            .count() as u64;
        QueueStats {
            name: self.name.clone(),
            total,
            pending: total.saturating_sub(in_flight),
            in_flight,
            concurrency,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().state.messages.is_empty()
    }

    /// Snapshot current state and truncate the replayed WAL prefix.
    pub fn compact(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        inner.wal.flush()?;
        let seq = inner.wal.write_seq();
        snapshot::write(&inner.snapshot_path, seq, &inner.state)?;
        inner.wal.truncate_before(seq + 1)?;
        tracing::info!(seq, "queue store compacted");
        Ok(())
    }
}

impl Inner {
    fn commit(&mut self, record: QueueRecord) -> Result<(), StorageError> {
        self.wal.append(&record)?;
        self.state.apply(&record);
        Ok(())
    }

    /// Drop expired claims and move their messages to the tail.
    fn requeue_expired(&mut self, now_ms: u64) {
        let expired: Vec<MessageId> = self
            .claims
            .iter()
            .filter(|(_, c)| c.deadline_ms <= now_ms)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            self.claims.remove(&id);
            if let Some(index) = self.state.messages.iter().position(|m| m.id == id) {
                let message = self.state.messages.remove(index);
                tracing::warn!(message_id = %message.id, job_id = %message.job_id, "visibility expired, requeueing message");
                self.state.messages.push(message);
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
