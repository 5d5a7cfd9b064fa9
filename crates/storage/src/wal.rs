// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL write-ahead log.
//!
//! One record per line as `{"seq": N, "record": {...}}`. A corrupt tail
//! (partial write, crash mid-line, binary garbage) is handled on open: the
//! damaged file is rotated to `.bak` (up to three backups kept) and the
//! valid prefix rewritten in place, so a crash never blocks startup.

use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Appends buffered past this count force a flush.
const FLUSH_THRESHOLD: usize = 100;

/// How many rotated `.bak` files to keep around.
const MAX_BACKUPS: u32 = 3;

/// One replayable line of the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry<T> {
    pub seq: u64,
    pub record: T,
}

/// Write-ahead log over records of type `T`.
pub struct Wal<T> {
    path: PathBuf,
    writer: BufWriter<File>,
    write_seq: u64,
    pending: usize,
    _record: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> Wal<T> {
    /// Open (creating if absent) and replay the log.
    ///
    /// `base_seq` is the sequence number already covered by a snapshot;
    /// numbering continues above it even when the matching entries were
    /// truncated away. Returns the handle plus every valid entry in
    /// sequence order. If the file holds a corrupt tail, the original is
    /// rotated to `.bak` and the valid prefix is rewritten before the
    /// handle is returned.
    pub fn open(
        path: impl Into<PathBuf>,
        base_seq: u64,
    ) -> Result<(Self, Vec<WalEntry<T>>), StorageError> {
        let path = path.into();
        let (entries, corrupt) = read_entries::<T>(&path)?;

        if corrupt {
            tracing::warn!(path = %path.display(), valid = entries.len(), "wal corruption detected, rotating to .bak");
            rotate_backups(&path)?;
            rewrite(&path, &entries)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let write_seq = entries.last().map(|e| e.seq).unwrap_or(0).max(base_seq);

        Ok((
            Self {
                path,
                writer: BufWriter::new(file),
                write_seq,
                pending: 0,
                _record: PhantomData,
            },
            entries,
        ))
    }

    /// Append a record, returning its sequence number.
    ///
    /// Buffered; call [`flush`](Self::flush) for durability. The buffer is
    /// flushed automatically past a threshold.
    pub fn append(&mut self, record: &T) -> Result<u64, StorageError> {
        let seq = self.write_seq + 1;
        let line = serde_json::to_string(&WalEntry { seq, record })?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.write_seq = seq;
        self.pending += 1;
        if self.pending >= FLUSH_THRESHOLD {
            self.flush()?;
        }
        Ok(seq)
    }

    /// Flush buffered appends to disk.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        if self.pending == 0 {
            return Ok(());
        }
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.pending = 0;
        Ok(())
    }

    /// Highest sequence number appended so far.
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Drop entries with `seq < keep_from` (after a snapshot covered them).
    pub fn truncate_before(&mut self, keep_from: u64) -> Result<(), StorageError> {
        self.flush()?;
        let (entries, _) = read_entries::<T>(&self.path)?;
        let retained: Vec<_> = entries.into_iter().filter(|e| e.seq >= keep_from).collect();
        rewrite(&self.path, &retained)?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        Ok(())
    }
}

/// Read all parseable entries; the bool reports whether a corrupt tail
/// (or interleaved garbage) was encountered.
fn read_entries<T: DeserializeOwned>(path: &Path) -> Result<(Vec<WalEntry<T>>, bool), StorageError> {
    let raw = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), false)),
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    let mut corrupt = false;
    for line in raw.split(|b| *b == b'\n') {
        if line.is_empty() {
            continue;
        }
        let parsed = std::str::from_utf8(line)
            .ok()
            .and_then(|s| serde_json::from_str::<WalEntry<T>>(s).ok());
        match parsed {
            Some(entry) => entries.push(entry),
            None => {
                // Stop at the first unreadable line; anything past it is
                // untrusted even if it happens to parse.
                corrupt = true;
                break;
            }
        }
    }
    Ok((entries, corrupt))
}

fn rewrite<T: Serialize>(path: &Path, entries: &[WalEntry<T>]) -> Result<(), StorageError> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&serde_json::to_string(entry)?);
        out.push('\n');
    }
    let tmp = path.with_extension("wal.tmp");
    std::fs::write(&tmp, out)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Shift `.bak` → `.bak.2` → `.bak.3` (evicting the oldest) and copy the
/// current file to `.bak`.
fn rotate_backups(path: &Path) -> Result<(), StorageError> {
    let backup = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };
    let _ = std::fs::remove_file(backup(MAX_BACKUPS));
    for n in (1..MAX_BACKUPS).rev() {
        let from = backup(n);
        if from.exists() {
            let _ = std::fs::rename(&from, backup(n + 1));
        }
    }
    std::fs::copy(path, backup(1))?;
    Ok(())
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
