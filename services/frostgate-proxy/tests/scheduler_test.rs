//! Tests for the idle scheduler's drain-and-offload loop and the lifecycle
//! manager's preconditions, driven tick by tick with short windows.

mod support;

use std::sync::Arc;
use std::time::Duration;

use frostgate_core::{CollectionState, ReloadMode};
use frostgate_proxy::{IdleScheduler, ReloadOutcome};
use frostgate_state::StateStore;
use support::{EngineBehavior, Harness};

fn scheduler_for(
    harness: &Harness,
    offload_after: chrono::Duration,
    grace: Duration,
) -> Arc<IdleScheduler> {
    Arc::new(IdleScheduler::with_timings(
        harness.store.clone() as Arc<dyn StateStore>,
        Arc::clone(&harness.manager),
        offload_after,
        grace,
        Duration::from_secs(60),
        4,
    ))
}

#[tokio::test]
async fn test_idle_collection_is_drained_and_offloaded() {
    let harness = Harness::new(ReloadMode::Blocking, EngineBehavior::default()).await;
    harness
        .seed_hot("movies", vec![r#"{"id":"1"}"#, r#"{"id":"2"}"#])
        .await;

    let scheduler = scheduler_for(
        &harness,
        chrono::Duration::milliseconds(100),
        Duration::from_millis(100),
    );

    tokio::time::sleep(Duration::from_millis(250)).await;
    scheduler.run_once().await.unwrap();

    // Draining takes effect immediately so writes start bouncing
    assert_eq!(
        harness.store.get("movies").await.unwrap(),
        Some(CollectionState::Draining)
    );

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(
        harness.store.get("movies").await.unwrap(),
        Some(CollectionState::Cold)
    );
    assert!(!harness.engine.has_collection("movies").await);

    let snapshot = harness.snapshots.load("movies").await.unwrap();
    assert_eq!(
        String::from_utf8(snapshot.documents).unwrap(),
        "{\"id\":\"1\"}\n{\"id\":\"2\"}\n"
    );

    // The snapshot is enough to bring the collection back whole
    assert_eq!(
        harness.manager.reload("movies").await.unwrap(),
        ReloadOutcome::Reloaded
    );
    assert!(harness.engine.has_collection("movies").await);
    assert_eq!(harness.engine.documents("movies").await.len(), 2);
    assert_eq!(
        harness.store.get("movies").await.unwrap(),
        Some(CollectionState::Hot)
    );
}

#[tokio::test]
async fn test_access_during_grace_cancels_offload() {
    let harness = Harness::new(ReloadMode::Blocking, EngineBehavior::default()).await;
    harness.seed_hot("movies", vec![r#"{"id":"1"}"#]).await;

    let scheduler = scheduler_for(
        &harness,
        chrono::Duration::milliseconds(400),
        Duration::from_millis(600),
    );

    tokio::time::sleep(Duration::from_millis(600)).await;
    scheduler.run_once().await.unwrap();
    assert_eq!(
        harness.store.get("movies").await.unwrap(),
        Some(CollectionState::Draining)
    );

    // Activity resumes midway through the grace window
    tokio::time::sleep(Duration::from_millis(300)).await;
    harness.store.touch("movies").await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(
        harness.store.get("movies").await.unwrap(),
        Some(CollectionState::Hot)
    );
    assert!(harness.engine.has_collection("movies").await);
    assert_eq!(harness.engine.delete_calls(), 0);
}

#[tokio::test]
async fn test_recently_accessed_collection_is_left_alone() {
    let harness = Harness::new(ReloadMode::Blocking, EngineBehavior::default()).await;
    harness.seed_hot("movies", vec![r#"{"id":"1"}"#]).await;

    let scheduler = scheduler_for(
        &harness,
        chrono::Duration::hours(1),
        Duration::from_millis(50),
    );
    scheduler.run_once().await.unwrap();

    assert_eq!(
        harness.store.get("movies").await.unwrap(),
        Some(CollectionState::Hot)
    );
    assert_eq!(harness.engine.delete_calls(), 0);
}

#[tokio::test]
async fn test_reload_skips_when_not_cold() {
    let harness = Harness::new(ReloadMode::Blocking, EngineBehavior::default()).await;
    harness.seed_hot("movies", vec![r#"{"id":"1"}"#]).await;

    assert_eq!(
        harness.manager.reload("movies").await.unwrap(),
        ReloadOutcome::Skipped
    );
    assert_eq!(harness.engine.create_calls(), 0);
}

#[tokio::test]
async fn test_offload_skips_when_not_draining() {
    let harness = Harness::new(ReloadMode::Blocking, EngineBehavior::default()).await;
    harness.seed_hot("movies", vec![r#"{"id":"1"}"#]).await;

    harness.manager.offload("movies").await.unwrap();

    assert_eq!(
        harness.store.get("movies").await.unwrap(),
        Some(CollectionState::Hot)
    );
    assert!(harness.engine.has_collection("movies").await);
    assert_eq!(harness.engine.delete_calls(), 0);
}

#[tokio::test]
async fn test_failed_reload_reverts_to_cold() {
    let harness = Harness::new(ReloadMode::Blocking, EngineBehavior::default()).await;
    // Cold record with no snapshot on disk
    harness
        .store
        .force_set("movies", CollectionState::Cold)
        .await
        .unwrap();

    let err = harness.manager.reload("movies").await.unwrap_err();
    assert!(matches!(
        err,
        frostgate_core::CoreError::SnapshotIncomplete { .. }
    ));

    // The failed attempt leaves the collection retryable
    assert_eq!(
        harness.store.get("movies").await.unwrap(),
        Some(CollectionState::Cold)
    );
}
