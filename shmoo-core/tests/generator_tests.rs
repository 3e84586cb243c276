mod common;

use common::*;
use shmoo_core::{
    ChainError, GENERIC_FAILURE_MESSAGE, GenerationError, GeneratorConfig, PointEvent,
    PointGenerator, RetentionPolicy, WalletSession,
};
use shmoo_types::{FailureKind, ShmooPoint, TransactionStatus, UserStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn seeded_stats() -> UserStats {
    UserStats {
        total_clicks: 5,
        streak_count: 3,
        last_click_timestamp: MORNING - 60 * 60 * 1000,
        daily_clicks: 2,
    }
}

fn seeded_repository() -> MemoryRepository {
    let repository = MemoryRepository::new();
    let point = ShmooPoint::confirmed(TEST_ADDRESS.to_string(), "0xold".to_string(), MORNING - 1);
    repository.seed(TEST_ADDRESS, seeded_stats(), vec![point]);
    repository
}

#[tokio::test]
async fn test_confirmed_generation_updates_and_persists() {
    let h = harness(ScriptedChain::new());

    let point = h.generator.generate().await.unwrap();

    assert_eq!(point.user_address, TEST_ADDRESS);
    assert_eq!(point.timestamp, MORNING);
    let hash = point.tx_hash.clone().unwrap();
    assert_eq!(point.point_id, format!("{}_0", hash));

    let expected = UserStats {
        total_clicks: 1,
        streak_count: 1,
        last_click_timestamp: MORNING,
        daily_clicks: 1,
    };
    assert_eq!(h.generator.stats().await, expected);
    assert_eq!(h.generator.points().await, vec![point.clone()]);

    let snapshot = h.generator.snapshot();
    assert_eq!(snapshot.status, TransactionStatus::Confirmed);
    assert_eq!(snapshot.tx_hash, Some(hash));
    assert_eq!(snapshot.error, None);

    assert_eq!(h.repository.save_count(), 1);
    assert_eq!(h.repository.stored(TEST_ADDRESS), Some((expected, vec![point])));
    assert_eq!(h.chain.submits(), 1);
    assert_eq!(h.chain.confirms(), 1);
}

#[tokio::test]
async fn test_status_is_pending_before_submission_resolves() {
    let gate = Arc::new(Notify::new());
    let h = harness(ScriptedChain::new().gated(gate.clone()));
    let mut updates = h.generator.subscribe();

    let generator = h.generator.clone();
    let task = tokio::spawn(async move { generator.generate().await });

    while h.chain.submits() == 0 {
        tokio::task::yield_now().await;
    }

    assert_eq!(h.generator.status(), TransactionStatus::Pending);
    assert!(h.generator.is_generating());
    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().status, TransactionStatus::Pending);

    gate.notify_one();
    let point = task.await.unwrap().unwrap();
    assert!(point.tx_hash.is_some());
    assert_eq!(h.generator.status(), TransactionStatus::Confirmed);
    assert!(!h.generator.is_generating());
}

#[tokio::test]
async fn test_click_while_pending_is_dropped() {
    let gate = Arc::new(Notify::new());
    let h = harness(ScriptedChain::new().gated(gate.clone()));

    let generator = h.generator.clone();
    let task = tokio::spawn(async move { generator.generate().await });
    while h.chain.submits() == 0 {
        tokio::task::yield_now().await;
    }

    let second = h.generator.generate().await;
    assert!(matches!(second, Err(GenerationError::AlreadyGenerating)));
    assert_eq!(h.chain.submits(), 1);
    assert!(h.events.has_event_type(|e| matches!(e, PointEvent::ClickDropped { .. })));

    gate.notify_one();
    task.await.unwrap().unwrap();

    // Only the first click produced a point
    assert_eq!(h.generator.stats().await.total_clicks, 1);
    assert_eq!(h.repository.save_count(), 1);
}

#[tokio::test]
async fn test_abandoned_caller_still_completes_attempt() {
    let gate = Arc::new(Notify::new());
    let h = harness(ScriptedChain::new().gated(gate.clone()));

    let generator = h.generator.clone();
    let caller = tokio::spawn(async move { generator.generate().await });
    while h.chain.submits() == 0 {
        tokio::task::yield_now().await;
    }

    // The caller goes away mid-submission, e.g. a closed HTTP connection
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());
    assert_eq!(h.generator.status(), TransactionStatus::Pending);

    gate.notify_one();
    while h.generator.is_generating() {
        tokio::task::yield_now().await;
    }

    assert_eq!(h.generator.status(), TransactionStatus::Confirmed);
    assert_eq!(h.generator.stats().await.total_clicks, 1);
    assert_eq!(h.repository.save_count(), 1);

    // The session accepts the next click
    gate.notify_one();
    h.generator.generate().await.unwrap();
    assert_eq!(h.generator.stats().await.total_clicks, 2);
    assert_eq!(h.chain.submits(), 2);
}

#[tokio::test]
async fn test_submission_rejected_leaves_state_untouched() {
    let h = harness_with(
        ScriptedChain::new().reject_submission("User denied"),
        seeded_repository(),
        GeneratorConfig::default(),
    );
    h.generator.load_session().await.unwrap();

    let result = h.generator.generate().await;

    match result {
        Err(GenerationError::Submission(message)) => assert_eq!(message, "User denied"),
        other => panic!("Expected submission error, got {:?}", other),
    }

    let snapshot = h.generator.snapshot();
    assert_eq!(snapshot.status, TransactionStatus::Failed);
    assert_eq!(snapshot.error.as_deref(), Some("User denied"));
    assert_eq!(snapshot.failure, Some(FailureKind::Submission));
    assert_eq!(snapshot.tx_hash, None);

    assert_eq!(h.chain.confirms(), 0);
    assert_eq!(h.repository.save_count(), 0);
    assert_eq!(h.repository.stored(TEST_ADDRESS).unwrap().0, seeded_stats());
    assert_eq!(h.generator.stats().await, seeded_stats());
}

#[tokio::test]
async fn test_confirmation_false_fails_without_write() {
    let h = harness_with(
        ScriptedChain::new().confirm_with(Ok(false)),
        seeded_repository(),
        GeneratorConfig::default(),
    );
    h.generator.load_session().await.unwrap();

    let result = h.generator.generate().await;
    assert!(matches!(result, Err(GenerationError::ConfirmationFailure(_))));

    let snapshot = h.generator.snapshot();
    assert_eq!(snapshot.status, TransactionStatus::Failed);
    assert_eq!(snapshot.failure, Some(FailureKind::ConfirmationFailure));
    assert_eq!(snapshot.error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
    assert!(snapshot.tx_hash.is_some());

    assert_eq!(h.repository.save_count(), 0);
    assert_eq!(h.repository.stored(TEST_ADDRESS).unwrap().0, seeded_stats());
    assert_eq!(h.generator.point_count().await, 1);
}

#[tokio::test]
async fn test_confirmation_rpc_error_is_generic_failure() {
    let h = harness(ScriptedChain::new().confirm_with(Err(ChainError::Transport(
        "connection reset".to_string(),
    ))));

    let result = h.generator.generate().await;

    assert!(matches!(result, Err(GenerationError::ConfirmationFailure(_))));
    assert_eq!(
        h.generator.snapshot().error.as_deref(),
        Some(GENERIC_FAILURE_MESSAGE)
    );
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_timeout_is_bounded() {
    let config = GeneratorConfig {
        confirmation_timeout: Duration::from_secs(60),
        ..GeneratorConfig::default()
    };
    let h = harness_with(
        ScriptedChain::new().slow_confirmation(Duration::from_secs(120)),
        MemoryRepository::new(),
        config,
    );
    let started = tokio::time::Instant::now();

    let result = h.generator.generate().await;

    assert!(matches!(result, Err(GenerationError::ConfirmationTimeout)));
    assert!(started.elapsed() < Duration::from_secs(120));
    let snapshot = h.generator.snapshot();
    assert_eq!(snapshot.failure, Some(FailureKind::ConfirmationTimeout));
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Transaction confirmation timed out")
    );
    assert_eq!(h.repository.save_count(), 0);
}

#[tokio::test]
async fn test_chain_reported_timeout_maps_to_timeout() {
    let h = harness(
        ScriptedChain::new().confirm_with(Err(ChainError::Timeout(Duration::from_secs(60)))),
    );

    let result = h.generator.generate().await;
    assert!(matches!(result, Err(GenerationError::ConfirmationTimeout)));
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_returns_to_idle_after_display_delay() {
    let h = harness(ScriptedChain::new());

    h.generator.generate().await.unwrap();
    assert_eq!(h.generator.status(), TransactionStatus::Confirmed);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.generator.status(), TransactionStatus::Confirmed);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    tokio::task::yield_now().await;
    assert_eq!(h.generator.status(), TransactionStatus::Idle);
    assert!(h.events.has_event_type(|e| matches!(e, PointEvent::Reset { .. })));

    // The reset is presentation only
    assert_eq!(h.generator.stats().await.total_clicks, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_reset_does_not_clobber_newer_attempt() {
    let h = harness(ScriptedChain::new());

    h.generator.generate().await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    h.generator.generate().await.unwrap();

    // First reset fires at 3s but belongs to the older attempt
    tokio::time::sleep(Duration::from_millis(1500)).await;
    tokio::task::yield_now().await;
    assert_eq!(h.generator.status(), TransactionStatus::Confirmed);

    tokio::time::sleep(Duration::from_secs(2)).await;
    tokio::task::yield_now().await;
    assert_eq!(h.generator.status(), TransactionStatus::Idle);
}

#[tokio::test]
async fn test_retry_starts_a_fresh_attempt() {
    let h = harness(ScriptedChain::new().confirm_with(Ok(false)));

    let failed = h.generator.generate().await;
    assert!(failed.is_err());
    let failed_hash = h.generator.snapshot().tx_hash.unwrap();

    let point = h.generator.retry().await.unwrap();

    assert_ne!(point.tx_hash.as_deref(), Some(failed_hash.as_str()));
    assert_eq!(h.chain.submits(), 2);
    assert_eq!(h.generator.status(), TransactionStatus::Confirmed);
    assert_eq!(h.generator.stats().await.total_clicks, 1);
    assert_eq!(h.repository.save_count(), 1);
}

#[tokio::test]
async fn test_retry_only_from_failed() {
    let h = harness(ScriptedChain::new());

    let result = h.generator.retry().await;
    assert!(matches!(
        result,
        Err(GenerationError::InvalidState {
            current: TransactionStatus::Idle
        })
    ));
    assert_eq!(h.chain.submits(), 0);
}

#[tokio::test]
async fn test_submit_after_failure_is_implicit_dismiss() {
    let h = harness(ScriptedChain::new().reject_submission("User denied"));

    assert!(h.generator.generate().await.is_err());
    assert_eq!(h.generator.status(), TransactionStatus::Failed);

    h.generator.generate().await.unwrap();
    assert_eq!(h.generator.status(), TransactionStatus::Confirmed);
}

#[tokio::test]
async fn test_dismiss_clears_failure() {
    let h = harness(ScriptedChain::new().reject_submission("User denied"));

    assert!(!h.generator.dismiss());
    assert!(h.generator.generate().await.is_err());

    assert!(h.generator.dismiss());
    assert_eq!(h.generator.snapshot(), shmoo_types::TransactionSnapshot::idle());
}

#[tokio::test]
async fn test_disconnected_wallet_cannot_generate() {
    let chain = Arc::new(ScriptedChain::new());
    let repository = Arc::new(MemoryRepository::new());
    let generator = Arc::new(PointGenerator::new(
        WalletSession::disconnected(),
        chain.clone(),
        repository.clone(),
    ));

    generator.load_session().await.unwrap();
    let result = generator.generate().await;

    assert!(matches!(result, Err(GenerationError::WalletNotConnected)));
    assert_eq!(generator.status(), TransactionStatus::Idle);
    assert_eq!(chain.submits(), 0);
    assert_eq!(repository.save_count(), 0);
}

#[tokio::test]
async fn test_streak_continues_from_loaded_session() {
    let h = harness_with(
        ScriptedChain::new(),
        seeded_repository(),
        GeneratorConfig::default(),
    );
    h.generator.load_session().await.unwrap();

    let point = h.generator.generate().await.unwrap();

    let stats = h.generator.stats().await;
    assert_eq!(stats.total_clicks, 6);
    assert_eq!(stats.streak_count, 4);
    assert_eq!(stats.last_click_timestamp, MORNING);

    let points = h.generator.points().await;
    assert_eq!(points.len(), 2);
    assert_eq!(points[0], point);
    assert_eq!(points[1].tx_hash.as_deref(), Some("0xold"));
}

#[tokio::test]
async fn test_retention_bounds_history() {
    let config = GeneratorConfig {
        retention: RetentionPolicy::new(2),
        ..GeneratorConfig::default()
    };
    let h = harness_with(ScriptedChain::new(), MemoryRepository::new(), config);

    let mut generated = Vec::new();
    for _ in 0..3 {
        generated.push(h.generator.generate().await.unwrap());
        h.clock.advance(1000);
    }

    let points = h.generator.points().await;
    assert_eq!(points, vec![generated[2].clone(), generated[1].clone()]);
    assert_eq!(h.repository.stored(TEST_ADDRESS).unwrap().1.len(), 2);
    // Totals keep counting past the retained history
    assert_eq!(h.generator.stats().await.total_clicks, 3);
    assert_eq!(h.generator.recent_points(1).await, vec![generated[2].clone()]);
}

#[tokio::test]
async fn test_store_failure_still_confirms() {
    let repository = MemoryRepository::new();
    repository.fail_saves();
    let h = harness_with(ScriptedChain::new(), repository, GeneratorConfig::default());

    let point = h.generator.generate().await.unwrap();

    assert_eq!(h.generator.status(), TransactionStatus::Confirmed);
    assert_eq!(h.generator.points().await, vec![point]);
    assert_eq!(h.repository.stored(TEST_ADDRESS), None);
}

#[tokio::test]
async fn test_lifecycle_events_in_order() {
    let h = harness(ScriptedChain::new());

    h.generator.generate().await.unwrap();

    let events = h.events.get_events();
    assert!(matches!(events[0], PointEvent::AttemptStarted { attempt: 1, .. }));
    assert!(matches!(events[1], PointEvent::Submitted { .. }));
    assert!(matches!(events[2], PointEvent::Confirmed { .. }));
    assert!(events.iter().all(|e| e.address() == TEST_ADDRESS));
}

#[tokio::test]
async fn test_activity_tracks_clock() {
    let h = harness(ScriptedChain::new());
    assert_eq!(h.generator.last_activity(), MORNING);

    h.clock.advance(5000);
    h.generator.generate().await.unwrap();
    assert_eq!(h.generator.last_activity(), MORNING + 5000);
}
