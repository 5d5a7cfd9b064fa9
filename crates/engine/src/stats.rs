// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue stats broadcaster: `queue:stats` on a 5-second ticker.

use crate::bus::EventBus;
use crate::queue::QueueManager;
use quaero_core::{Clock, Event, SharedClock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const STATS_INTERVAL: Duration = Duration::from_secs(5);

pub struct StatsBroadcaster {
    queue: QueueManager,
    bus: EventBus,
    clock: SharedClock,
    concurrency: u32,
    interval: Duration,
    cancel: CancellationToken,
    handle: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl StatsBroadcaster {
    pub fn new(
        queue: QueueManager,
        bus: EventBus,
        clock: SharedClock,
        concurrency: u32,
        interval: Duration,
    ) -> Self {
        Self {
            queue,
            bus,
            clock,
            concurrency,
            interval,
            cancel: CancellationToken::new(),
            handle: parking_lot::Mutex::new(None),
        }
    }

    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return;
        }
        let queue = self.queue.clone();
        let bus = self.bus.clone();
        let clock = self.clock.clone();
        let concurrency = self.concurrency;
        let interval = self.interval;
        let cancel = self.cancel.clone();
        *handle = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                bus.publish(Event::QueueStats {
                    stats: queue.stats(concurrency),
                    timestamp_ms: clock.epoch_ms(),
                });
            }
        }));
    }

    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.await;
        }
    }
}
