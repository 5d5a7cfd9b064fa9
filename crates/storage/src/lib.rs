// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable persistence for jobs and the message queue.
//!
//! Both stores follow the same discipline: an append-only JSONL write-ahead
//! log replayed into in-memory state on open, with periodic zstd snapshots
//! to bound replay time. The job store exclusively owns job and log rows;
//! the queue store exclusively owns message rows. Visibility deadlines are
//! deliberately not persisted — a restart clears them, which is exactly the
//! at-least-once redelivery the queue promises.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod jobs;
mod queue;
mod snapshot;
mod wal;

pub use error::StorageError;
pub use jobs::{JobRecord, JobStore};
pub use queue::{QueueRecord, QueueStore, Receipt};
pub use wal::{Wal, WalEntry};
