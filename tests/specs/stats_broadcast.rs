// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue stats tick onto the bus with live counts.

use crate::support::{definitions, world, WorldConfig};
use quaero_core::{Event, JobSeed, MessageId, QueueMessage};
use quaero_engine::StatsBroadcaster;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn ticker_reports_pending_and_in_flight() {
    // Pool intentionally not started: counts must stay put
    let w = world(
        definitions(&[]),
        WorldConfig {
            start: false,
            ..WorldConfig::default()
        },
    )
    .await;
    let services = w.runtime.services();

    let parent = services
        .jobs
        .create_parent_job(JobSeed::new("backlog", "step"))
        .unwrap();
    for n in 0..19 {
        let child = services
            .jobs
            .create_child_job(&parent.id, JobSeed::new(format!("c{n}"), "crawler_url"))
            .unwrap();
        services
            .queue
            .enqueue(QueueMessage {
                id: MessageId::generate(),
                job_id: child.id.clone(),
                job_type: child.job_type.clone(),
                payload: serde_json::Value::Null,
                depth: 0,
                parent_id: Some(parent.id.clone()),
                enqueued_at_ms: n,
            })
            .unwrap();
    }
    // Put 7 in flight
    let token = CancellationToken::new();
    let mut receipts = Vec::new();
    for _ in 0..7 {
        receipts.push(services.queue.receive(&token).await.unwrap());
    }

    let broadcaster = StatsBroadcaster::new(
        services.queue.clone(),
        services.bus.clone(),
        services.clock.clone(),
        5,
        Duration::from_millis(50),
    );
    let mut events = w.runtime.bus().subscribe();
    broadcaster.start();

    let mut ticks = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while ticks.len() < 2 && tokio::time::Instant::now() < deadline {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Ok(Event::QueueStats { stats, .. })) => ticks.push(stats),
            Ok(_) => {}
            Err(_) => break,
        }
    }
    broadcaster.stop().await;

    assert!(ticks.len() >= 2, "expected repeated stats ticks");
    for stats in &ticks {
        assert_eq!(stats.total, 19);
        assert_eq!(stats.in_flight, 7);
        assert_eq!(stats.pending, 12);
        assert_eq!(stats.concurrency, 5);
    }
}
