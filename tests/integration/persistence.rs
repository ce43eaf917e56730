//! Integration tests for durable state
//!
//! These tests verify that:
//! - History and latest survive a restart
//! - A shrunken window truncates restored history
//! - Failed writes keep the in-memory state serving

use live_monitor::{
    actors::MonitorHandle,
    config::MonitorConfig,
    storage::{StateStore, sqlite::SqliteStore},
};
use std::path::Path;
use tempfile::tempdir;

use crate::helpers::*;

fn one_minute_window(poll_interval_ms: u64) -> MonitorConfig {
    let mut config = create_test_config(poll_interval_ms);
    config.history_minutes = 1;
    config
}

async fn open_store(path: &Path) -> Box<dyn StateStore> {
    Box::new(SqliteStore::new(path).await.unwrap())
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("monitor.db");

    let source = ScriptedSource::healthy();
    let monitor = MonitorHandle::spawn(
        create_test_config(60_000),
        source.clone(),
        open_store(&db_path).await,
    )
    .await;

    for _ in 0..3 {
        monitor.refresh().await.unwrap();
    }
    let before = monitor.history().await.unwrap();
    monitor.shutdown().await.unwrap();

    let restarted_source = ScriptedSource::healthy();
    let restarted = MonitorHandle::spawn(
        create_test_config(60_000),
        restarted_source.clone(),
        open_store(&db_path).await,
    )
    .await;

    let diagnostics = restarted.diagnostics().await.unwrap();
    assert_eq!(diagnostics.history_len, 3);

    // Restored latest is fresh, so no upstream call is needed
    let after = restarted.history().await.unwrap();
    assert_eq!(after, before);
    assert_eq!(restarted_source.calls(), 0);

    restarted.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shrunken_window_truncates_restored_history() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("monitor.db");

    // One minute at 15s: four samples
    let monitor = MonitorHandle::spawn(
        one_minute_window(15_000),
        ScriptedSource::healthy(),
        open_store(&db_path).await,
    )
    .await;
    for _ in 0..4 {
        monitor.refresh().await.unwrap();
    }
    let before = monitor.history().await.unwrap();
    assert_eq!(before.history.len(), 4);
    monitor.shutdown().await.unwrap();

    // One minute at 30s: two samples
    let restarted = MonitorHandle::spawn(
        one_minute_window(30_000),
        ScriptedSource::healthy(),
        open_store(&db_path).await,
    )
    .await;

    let diagnostics = restarted.diagnostics().await.unwrap();
    assert_eq!(diagnostics.window_capacity, 2);
    assert_eq!(diagnostics.history_len, 2);

    let after = restarted.history().await.unwrap();
    assert_eq!(after.history, before.history[2..].to_vec());
    assert_eq!(after.latest, before.latest);

    restarted.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_write_failure_keeps_serving_from_memory() {
    let source = ScriptedSource::healthy();
    let monitor = MonitorHandle::spawn(create_test_config(60_000), source.clone(), Box::new(FailingStore)).await;

    let sample = monitor.latest().await.unwrap();
    let again = monitor.latest().await.unwrap();

    assert_eq!(sample, again);
    assert_eq!(source.calls(), 1);

    let diagnostics = monitor.diagnostics().await.unwrap();
    assert_eq!(diagnostics.persist_failures, 1);
    assert_eq!(diagnostics.history_len, 1);

    let health = monitor.storage_health().await.unwrap();
    assert!(!health.healthy);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_write_failure_still_broadcasts() {
    let monitor = MonitorHandle::spawn(
        create_test_config(50),
        ScriptedSource::healthy(),
        Box::new(FailingStore),
    )
    .await;

    let mut subscription = monitor.subscribe().await.unwrap();
    next_sample(&mut subscription).await;
    let broadcast = next_sample(&mut subscription).await;

    assert_eq!(broadcast.status, "queueing");
    assert!(monitor.diagnostics().await.unwrap().persist_failures >= 1);

    monitor.shutdown().await.unwrap();
}
