// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process publish/subscribe for UI live updates.
//!
//! Fan-out over a bounded broadcast channel. Publish never blocks and
//! never fails the publisher; a subscriber that falls behind loses the
//! oldest events and a warning is logged when the lag is observed.

use quaero_core::Event;
use tokio::sync::broadcast;

const BUS_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Fire-and-forget publish. No subscribers is not an error.
    pub fn publish(&self, event: Event) {
        tracing::trace!(event = %event.log_summary(), "publish");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Register a callback subscriber on its own task.
    ///
    /// The task ends when the bus is dropped. Lagged deliveries drop the
    /// oldest events and keep going.
    pub fn subscribe_fn<F>(&self, name: &'static str, callback: F) -> tokio::task::JoinHandle<()>
    where
        F: Fn(Event) + Send + 'static,
    {
        let mut receiver = self.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => callback(event),
                    Err(broadcast::error::RecvError::Lagged(dropped)) => {
                        tracing::warn!(subscriber = name, dropped, "slow subscriber dropped events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
