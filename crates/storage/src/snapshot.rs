// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! zstd-compressed state snapshots.
//!
//! A snapshot records the materialized state as of a WAL sequence number so
//! open can replay only the tail. Written atomically (tmp file + rename).
//! An unreadable snapshot is treated as absent: the WAL remains the source
//! of truth.

use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

const COMPRESSION_LEVEL: i32 = 3;

#[derive(Serialize, Deserialize)]
struct SnapshotFile<S> {
    seq: u64,
    state: S,
}

pub(crate) fn write<S: Serialize>(path: &Path, seq: u64, state: &S) -> Result<(), StorageError> {
    let json = serde_json::to_vec(&SnapshotFile { seq, state })?;
    let compressed = zstd::encode_all(&json[..], COMPRESSION_LEVEL)?;
    let tmp = path.with_extension("snapshot.tmp");
    std::fs::write(&tmp, compressed)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn read<S: DeserializeOwned>(path: &Path) -> Result<Option<(u64, S)>, StorageError> {
    let compressed = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let json = match zstd::decode_all(&compressed[..]) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable snapshot, replaying full wal");
            return Ok(None);
        }
    };
    match serde_json::from_slice::<SnapshotFile<S>>(&json) {
        Ok(file) => Ok(Some((file.seq, file.state))),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "snapshot failed to parse, replaying full wal");
            Ok(None)
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
