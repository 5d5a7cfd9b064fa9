// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use quaero_core::{FakeClock, JobId, MessageId};
use tempfile::tempdir;

fn manager(dir: &std::path::Path, clock: FakeClock) -> QueueManager {
    let store = QueueStore::open(dir, "jobs").unwrap();
    QueueManager::new(
        store,
        SharedClock::new(clock),
        Duration::from_secs(60),
        Duration::from_millis(10),
    )
}

fn message(job: &str) -> QueueMessage {
    QueueMessage {
        id: MessageId::generate(),
        job_id: JobId::from_string(job),
        job_type: "crawler_url".to_string(),
        payload: serde_json::Value::Null,
        depth: 0,
        parent_id: None,
        enqueued_at_ms: 1,
    }
}

#[tokio::test]
async fn receive_returns_enqueued_message() {
    let dir = tempdir().unwrap();
    let queue = manager(dir.path(), FakeClock::new());
    queue.enqueue(message("job-1")).unwrap();

    let cancel = CancellationToken::new();
    let (received, _) = queue.receive(&cancel).await.unwrap();
    assert_eq!(received.job_id, "job-1");
}

#[tokio::test]
async fn receive_blocks_until_message_arrives() {
    let dir = tempdir().unwrap();
    let queue = manager(dir.path(), FakeClock::new());
    let cancel = CancellationToken::new();

    let waiter = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.receive(&cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!waiter.is_finished());

    queue.enqueue(message("job-late")).unwrap();
    let (received, _) = waiter.await.unwrap().unwrap();
    assert_eq!(received.job_id, "job-late");
}

#[tokio::test]
async fn receive_on_empty_queue_honors_cancellation() {
    let dir = tempdir().unwrap();
    let queue = manager(dir.path(), FakeClock::new());
    let cancel = CancellationToken::new();

    let waiter = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.receive(&cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(EngineError::Cancelled)));
}

#[tokio::test]
async fn delete_succeeds_after_receive_context_cancelled() {
    let dir = tempdir().unwrap();
    let queue = manager(dir.path(), FakeClock::new());
    queue.enqueue(message("job-1")).unwrap();

    let cancel = CancellationToken::new();
    let (_, receipt) = queue.receive(&cancel).await.unwrap();

    // The receive context dying must not block the delete
    cancel.cancel();
    queue.delete(&receipt).await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(
        queue.receive(&cancel).await,
        Err(EngineError::Cancelled)
    ));
}

#[tokio::test]
async fn expired_claim_redelivers_and_stales_old_receipt() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let queue = manager(dir.path(), clock.clone());
    queue.enqueue(message("job-1")).unwrap();

    let cancel = CancellationToken::new();
    let (_, first_receipt) = queue.receive(&cancel).await.unwrap();

    // Visibility lapses without extend
    clock.advance_ms(61_000);
    let (redelivered, _) = queue.receive(&cancel).await.unwrap();
    assert_eq!(redelivered.job_id, "job-1");

    let err = queue.delete(&first_receipt).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Storage(quaero_storage::StorageError::StaleReceipt(_))
    ));
}

#[tokio::test]
async fn extend_keeps_claim_alive_past_original_deadline() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let queue = manager(dir.path(), clock.clone());
    queue.enqueue(message("job-1")).unwrap();

    let cancel = CancellationToken::new();
    let (_, receipt) = queue.receive(&cancel).await.unwrap();

    clock.advance_ms(50_000);
    queue.extend(&receipt, Duration::from_secs(60)).unwrap();
    clock.advance_ms(50_000); // past original deadline, inside extension

    let racer = CancellationToken::new();
    racer.cancel();
    assert!(matches!(
        queue.receive(&racer).await,
        Err(EngineError::Cancelled)
    ));
    queue.delete(&receipt).await.unwrap();
}

#[tokio::test]
async fn stats_reflect_claims() {
    let dir = tempdir().unwrap();
    let queue = manager(dir.path(), FakeClock::new());
    for n in 0..3 {
        queue.enqueue(message(&format!("job-{n}"))).unwrap();
    }
    let cancel = CancellationToken::new();
    let _claim = queue.receive(&cancel).await.unwrap();

    let stats = queue.stats(5);
    assert_eq!(stats.total, 3);
    assert_eq!(stats.in_flight, 1);
    assert_eq!(stats.pending, 2);
}
