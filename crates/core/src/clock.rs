// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! All timestamps in the system are epoch milliseconds; components take a
//! `Clock` so tests can drive time deterministically.

use std::time::{SystemTime, UNIX_EPOCH};

/// A clock that provides the current time as epoch milliseconds.
pub trait Clock: Clone + Send + Sync + 'static {
    fn epoch_ms(&self) -> u64;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Type-erased clock handle.
///
/// Lets non-generic components (trait objects, registries) share one
/// clock while tests still inject a [`FakeClock`].
#[derive(Clone)]
pub struct SharedClock(std::sync::Arc<dyn DynClock>);

trait DynClock: Send + Sync {
    fn epoch_ms_dyn(&self) -> u64;
}

impl<C: Clock> DynClock for C {
    fn epoch_ms_dyn(&self) -> u64 {
        self.epoch_ms()
    }
}

impl SharedClock {
    pub fn new(clock: impl Clock) -> Self {
        Self(std::sync::Arc::new(clock))
    }

    pub fn system() -> Self {
        Self::new(SystemClock)
    }
}

impl Clock for SharedClock {
    fn epoch_ms(&self) -> u64 {
        self.0.epoch_ms_dyn()
    }
}

impl Default for SharedClock {
    fn default() -> Self {
        Self::system()
    }
}

/// Fake clock for tests with manually advanced time.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone)]
pub struct FakeClock {
    epoch_ms: std::sync::Arc<parking_lot::Mutex<u64>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeClock {
    /// Starts at a fixed, non-zero epoch so `Option<u64>` timestamps are
    /// distinguishable from unset.
    pub fn new() -> Self {
        Self {
            epoch_ms: std::sync::Arc::new(parking_lot::Mutex::new(1_700_000_000_000)),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        *self.epoch_ms.lock() += ms;
    }

    pub fn set_epoch_ms(&self, ms: u64) {
        *self.epoch_ms.lock() = ms;
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        *self.epoch_ms.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
