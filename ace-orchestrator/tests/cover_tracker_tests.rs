//! Cover regeneration tracking tests
//! Test File: cover_tracker_tests.rs

mod helpers;

use ace_common::events::StudioEvent;
use ace_orchestrator::orchestrator::COVER_REGENERATION_FAILED_MESSAGE;
use ace_orchestrator::OrchestratorError;
use helpers::*;
use std::sync::Arc;

async fn tracking(cover: Option<&str>) -> (Arc<FakeBackend>, ace_orchestrator::Orchestrator) {
    let backend = Arc::new(FakeBackend::new());
    backend.upsert(record_with_cover("r-1", "ready", cover));
    let orchestrator = orchestrator(backend.clone());
    orchestrator.poll_history().await.unwrap();
    orchestrator.regenerate_cover("r-1").await.unwrap();
    (backend, orchestrator)
}

/// TC-COV-001: Slot clears when the polled URL changes to a new value
#[tokio::test]
async fn tc_cov_001_clears_on_new_url() {
    // Given: Regeneration started while cover is a.png
    let (backend, orchestrator) = tracking(Some("a.png")).await;
    let state = orchestrator.cover_regeneration().await.unwrap();
    assert_eq!(state.target_id, "r-1");
    assert_eq!(state.previous_cover_url.as_deref(), Some("a.png"));
    assert_eq!(backend.state().cover_calls, vec!["r-1".to_string()]);

    // When: Poll returns b.png
    let mut rx = orchestrator.event_bus().subscribe();
    backend.upsert(record_with_cover("r-1", "ready", Some("b.png")));
    orchestrator.poll_history().await.unwrap();

    // Then: Slot cleared, completion announced
    assert!(orchestrator.cover_regeneration().await.is_none());
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        StudioEvent::CoverRegenerationCompleted { cover_url, .. } if cover_url == "b.png"
    )));
}

/// TC-COV-002: Unchanged URL keeps the slot active
#[tokio::test]
async fn tc_cov_002_same_url_keeps_slot() {
    let (_backend, orchestrator) = tracking(Some("a.png")).await;

    orchestrator.poll_history().await.unwrap();

    assert!(orchestrator.cover_tracker().is_generating("r-1").await);
}

/// TC-COV-003: Empty or absent URL keeps the slot active
#[tokio::test]
async fn tc_cov_003_empty_url_keeps_slot() {
    let (backend, orchestrator) = tracking(Some("a.png")).await;

    backend.upsert(record_with_cover("r-1", "ready", Some("")));
    orchestrator.poll_history().await.unwrap();
    assert!(orchestrator.cover_tracker().is_generating("r-1").await);

    backend.upsert(record_with_cover("r-1", "ready", None));
    orchestrator.poll_history().await.unwrap();
    assert!(orchestrator.cover_tracker().is_generating("r-1").await);

    // Record disappearing from history also keeps it
    backend.state().history.clear();
    orchestrator.poll_history().await.unwrap();
    assert!(orchestrator.cover_tracker().is_generating("r-1").await);
}

/// TC-COV-004: No previous cover, any non-empty URL completes
#[tokio::test]
async fn tc_cov_004_first_cover_completes() {
    let (backend, orchestrator) = tracking(None).await;
    assert_eq!(
        orchestrator.cover_regeneration().await.unwrap().previous_cover_url,
        None
    );

    backend.upsert(record_with_cover("r-1", "ready", Some("first.png")));
    orchestrator.poll_history().await.unwrap();

    assert!(orchestrator.cover_regeneration().await.is_none());
}

/// TC-COV-005: Request failure clears the slot and surfaces the message
#[tokio::test]
async fn tc_cov_005_failure_clears_slot() {
    let backend = Arc::new(FakeBackend::new());
    backend.upsert(record_with_cover("r-1", "ready", Some("a.png")));
    backend.state().fail_cover = true;
    let orchestrator = orchestrator(backend.clone());
    orchestrator.poll_history().await.unwrap();
    let mut rx = orchestrator.event_bus().subscribe();

    let err = orchestrator.regenerate_cover("r-1").await.unwrap_err();

    match err {
        OrchestratorError::CoverRegeneration(message) => {
            assert_eq!(message, COVER_REGENERATION_FAILED_MESSAGE)
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(orchestrator.cover_regeneration().await.is_none());

    // Record left unchanged
    let record = orchestrator.reconciler().record("r-1").await.unwrap();
    assert_eq!(record.cover_url(), Some("a.png"));

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(StudioEvent::CoverRegenerationStarted { .. })));
    assert!(matches!(events.last(), Some(StudioEvent::CoverRegenerationFailed { .. })));
}

/// TC-COV-006: A new request replaces tracking of the previous one
#[tokio::test]
async fn tc_cov_006_single_slot_replaced() {
    let backend = Arc::new(FakeBackend::new());
    backend.upsert(record_with_cover("r-1", "ready", Some("a.png")));
    backend.upsert(record_with_cover("r-2", "ready", Some("x.png")));
    let orchestrator = orchestrator(backend.clone());
    orchestrator.poll_history().await.unwrap();

    orchestrator.regenerate_cover("r-1").await.unwrap();
    orchestrator.regenerate_cover("r-2").await.unwrap();

    assert!(!orchestrator.cover_tracker().is_generating("r-1").await);
    assert!(orchestrator.cover_tracker().is_generating("r-2").await);

    // r-1 finishing is no longer observed; r-2 still tracked
    backend.upsert(record_with_cover("r-1", "ready", Some("b.png")));
    orchestrator.poll_history().await.unwrap();
    assert!(orchestrator.cover_tracker().is_generating("r-2").await);

    backend.upsert(record_with_cover("r-2", "ready", Some("y.png")));
    orchestrator.poll_history().await.unwrap();
    assert!(orchestrator.cover_regeneration().await.is_none());
}

/// TC-COV-007: Regeneration before any poll still captures the current cover
#[tokio::test]
async fn tc_cov_007_start_before_first_poll() {
    // Given: Backend has r-1 with a.png, orchestrator never polled
    let backend = Arc::new(FakeBackend::new());
    backend.upsert(record_with_cover("r-1", "ready", Some("a.png")));
    let orchestrator = orchestrator(backend.clone());

    // When: Regeneration starts immediately
    orchestrator.regenerate_cover("r-1").await.unwrap();

    // Then: Previous cover came from a fresh history fetch
    let state = orchestrator.cover_regeneration().await.unwrap();
    assert_eq!(state.previous_cover_url.as_deref(), Some("a.png"));

    // And: A poll still returning a.png keeps the slot active
    orchestrator.poll_history().await.unwrap();
    assert!(orchestrator.cover_tracker().is_generating("r-1").await);

    backend.upsert(record_with_cover("r-1", "ready", Some("b.png")));
    orchestrator.poll_history().await.unwrap();
    assert!(orchestrator.cover_regeneration().await.is_none());
}
