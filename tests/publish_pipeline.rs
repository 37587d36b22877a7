mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use inkwire::application::publish::{
    AttemptOutcome, LocatorTable, ResolveError, SkipReason, handler_factory,
};
use inkwire::domain::types::{FailureKind, PublishLogStatus, PublishTargetStatus};

use support::{MemoryStore, ScriptedHandler, publish_service};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn disabled_target_is_left_untouched() {
    let store = MemoryStore::new();
    let integration = store.seed_integration(Uuid::new_v4(), "scripted").await;
    let target = store.seed_target(&integration, false).await;
    let publisher = publish_service(&store, LocatorTable::new(), TIMEOUT);
    let calls = Arc::new(AtomicUsize::new(0));
    let factory_calls = calls.clone();
    publisher.registry().register(
        "scripted",
        handler_factory(move || ScriptedHandler {
            result: Ok(Some(json!({"ok": true}))),
            delay: None,
            calls: factory_calls.clone(),
        }),
    );

    let report = publisher
        .attempt_publish(target.id, json!({"title": "hello"}))
        .await
        .expect("attempt");

    assert_eq!(report.outcome, AttemptOutcome::Skipped(SkipReason::Disabled));
    assert_eq!(store.target(target.id).await, target);
    assert!(store.logs_for(target.id).await.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn registered_handler_success_publishes_target() {
    let store = MemoryStore::new();
    let integration = store.seed_integration(Uuid::new_v4(), "scripted").await;
    let target = store.seed_target(&integration, true).await;
    let publisher = publish_service(&store, LocatorTable::new(), TIMEOUT);
    publisher.registry().register(
        "scripted",
        handler_factory(|| ScriptedHandler::succeeding(json!({"ok": true}))),
    );

    let started = OffsetDateTime::now_utc();
    let report = publisher
        .attempt_publish(target.id, json!({"title": "hello"}))
        .await
        .expect("attempt");

    assert_eq!(report.outcome, AttemptOutcome::Published);
    let stored = store.target(target.id).await;
    assert_eq!(stored.status, PublishTargetStatus::Published);
    assert_eq!(stored.retry_count, 0);
    assert!(stored.last_error.is_none());
    assert!(stored.last_published_at.expect("published at") >= started);

    let logs = store.logs_for(target.id).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, PublishLogStatus::Success);
    assert_eq!(logs[0].response_payload, Some(json!({"ok": true})));
    assert_eq!(logs[0].request_payload, json!({"title": "hello"}));
    assert!(logs[0].error_message.is_empty());
    assert_eq!(store.definition_lookups(), 0);
}

#[tokio::test]
async fn failing_handler_counts_every_attempt() {
    let store = MemoryStore::new();
    let integration = store.seed_integration(Uuid::new_v4(), "scripted").await;
    let target = store.seed_target(&integration, true).await;
    let publisher = publish_service(&store, LocatorTable::new(), TIMEOUT);
    publisher
        .registry()
        .register("scripted", handler_factory(|| ScriptedHandler::failing("fail")));

    let first = publisher
        .attempt_publish(target.id, json!({}))
        .await
        .expect("first attempt");
    assert_eq!(
        first.outcome,
        AttemptOutcome::Failed {
            kind: FailureKind::HandlerPublish,
            message: "fail".to_string(),
        }
    );
    let stored = store.target(target.id).await;
    assert_eq!(stored.status, PublishTargetStatus::Failed);
    assert_eq!(stored.retry_count, 1);
    assert_eq!(stored.last_error.as_deref(), Some("fail"));

    let logs = store.logs_for(target.id).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, PublishLogStatus::Error);
    assert!(logs[0].error_message.contains("fail"));
    assert!(logs[0].response_payload.is_none());

    publisher
        .attempt_publish(target.id, json!({}))
        .await
        .expect("second attempt");
    let stored = store.target(target.id).await;
    assert_eq!(stored.retry_count, 2);
    assert_eq!(store.logs_for(target.id).await.len(), 2);
}

#[tokio::test]
async fn failed_target_recovers_on_success() {
    let store = MemoryStore::new();
    let integration = store.seed_integration(Uuid::new_v4(), "scripted").await;
    let target = store.seed_target(&integration, true).await;
    let publisher = publish_service(&store, LocatorTable::new(), TIMEOUT);
    publisher
        .registry()
        .register("scripted", handler_factory(|| ScriptedHandler::failing("down")));
    publisher
        .attempt_publish(target.id, json!({}))
        .await
        .expect("failing attempt");

    publisher.registry().register(
        "scripted",
        handler_factory(|| ScriptedHandler::succeeding(json!({"id": 7}))),
    );
    publisher
        .attempt_publish(target.id, json!({}))
        .await
        .expect("recovering attempt");

    let stored = store.target(target.id).await;
    assert_eq!(stored.status, PublishTargetStatus::Published);
    assert_eq!(stored.retry_count, 0);
    assert!(stored.last_error.is_none());
    assert_eq!(store.logs_for(target.id).await.len(), 2);
}

#[tokio::test]
async fn published_target_is_not_delivered_twice() {
    let store = MemoryStore::new();
    let integration = store.seed_integration(Uuid::new_v4(), "scripted").await;
    let target = store.seed_target(&integration, true).await;
    let publisher = publish_service(&store, LocatorTable::new(), TIMEOUT);
    publisher.registry().register(
        "scripted",
        handler_factory(|| ScriptedHandler::succeeding(json!({"ok": true}))),
    );

    publisher
        .attempt_publish(target.id, json!({}))
        .await
        .expect("first attempt");
    let after_first = store.target(target.id).await;

    let report = publisher
        .attempt_publish(target.id, json!({}))
        .await
        .expect("second attempt");

    assert_eq!(
        report.outcome,
        AttemptOutcome::Skipped(SkipReason::AlreadyPublished)
    );
    assert_eq!(store.target(target.id).await, after_first);
    assert_eq!(store.logs_for(target.id).await.len(), 1);
}

#[tokio::test]
async fn unknown_definition_is_recorded_as_failure() {
    let store = MemoryStore::new();
    let integration = store.seed_integration(Uuid::new_v4(), "ghost").await;
    let target = store.seed_target(&integration, true).await;
    let publisher = publish_service(&store, LocatorTable::new(), TIMEOUT);

    let report = publisher
        .attempt_publish(target.id, json!({}))
        .await
        .expect("attempt");

    assert!(matches!(
        report.outcome,
        AttemptOutcome::Failed {
            kind: FailureKind::DefinitionNotFound,
            ..
        }
    ));
    let logs = store.logs_for(target.id).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].error_kind, Some(FailureKind::DefinitionNotFound));
    assert!(!logs[0].error_message.is_empty());
    assert!(!publisher.registry().is_cached("ghost"));
}

#[tokio::test]
async fn unresolvable_locator_is_recorded_and_not_cached() {
    let store = MemoryStore::new();
    store.seed_definition("orphan", "inkwire::handlers::missing").await;
    let integration = store.seed_integration(Uuid::new_v4(), "orphan").await;
    let target = store.seed_target(&integration, true).await;
    let publisher = publish_service(&store, LocatorTable::new(), TIMEOUT);

    let report = publisher
        .attempt_publish(target.id, json!({}))
        .await
        .expect("attempt");

    assert!(matches!(
        report.outcome,
        AttemptOutcome::Failed {
            kind: FailureKind::HandlerResolution,
            ..
        }
    ));
    assert_eq!(store.target(target.id).await.retry_count, 1);
    assert!(!publisher.registry().is_cached("orphan"));
}

#[tokio::test]
async fn locator_resolution_is_cached_after_first_lookup() {
    let store = MemoryStore::new();
    store.seed_definition("scripted", "test::scripted").await;
    let integration = store.seed_integration(Uuid::new_v4(), "scripted").await;
    let first = store.seed_target(&integration, true).await;
    let second = store.seed_target(&integration, true).await;
    let locators = LocatorTable::new().with(
        "test::scripted",
        handler_factory(|| ScriptedHandler::succeeding(json!({"ok": true}))),
    );
    let publisher = publish_service(&store, locators, TIMEOUT);

    publisher
        .attempt_publish(first.id, json!({}))
        .await
        .expect("first");
    publisher
        .attempt_publish(second.id, json!({}))
        .await
        .expect("second");

    assert!(publisher.registry().is_cached("scripted"));
    assert_eq!(store.definition_lookups(), 1);
    assert_eq!(
        store.target(second.id).await.status,
        PublishTargetStatus::Published
    );
}

#[tokio::test]
async fn registered_factory_builds_fresh_instances_without_catalog() {
    let store = MemoryStore::new();
    let publisher = publish_service(&store, LocatorTable::new(), TIMEOUT);
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    publisher.registry().register(
        "x",
        handler_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ScriptedHandler::succeeding(json!({}))
        }),
    );

    assert!(publisher.registry().resolve("x").await.is_ok());
    assert!(publisher.registry().resolve("x").await.is_ok());

    assert_eq!(built.load(Ordering::SeqCst), 2);
    assert_eq!(store.definition_lookups(), 0);
}

#[tokio::test]
async fn unknown_code_fails_and_caches_nothing() {
    let store = MemoryStore::new();
    let publisher = publish_service(&store, LocatorTable::new(), TIMEOUT);

    let err = publisher
        .registry()
        .resolve("unknown")
        .await
        .err()
        .expect("resolution should fail");

    assert!(matches!(err, ResolveError::DefinitionNotFound { .. }));
    assert!(!publisher.registry().is_cached("unknown"));
}

#[tokio::test]
async fn concurrent_attempts_on_one_target_are_serialized() {
    let store = MemoryStore::new();
    let integration = store.seed_integration(Uuid::new_v4(), "scripted").await;
    let target = store.seed_target(&integration, true).await;
    let publisher = publish_service(&store, LocatorTable::new(), TIMEOUT);
    publisher.registry().register(
        "scripted",
        handler_factory(|| ScriptedHandler {
            result: Err("busy".to_string()),
            delay: Some(Duration::from_millis(20)),
            calls: Arc::new(AtomicUsize::new(0)),
        }),
    );

    let (first, second) = tokio::join!(
        publisher.attempt_publish(target.id, json!({"n": 1})),
        publisher.attempt_publish(target.id, json!({"n": 2})),
    );

    first.expect("first attempt");
    second.expect("second attempt");
    assert_eq!(store.target(target.id).await.retry_count, 2);
    assert_eq!(store.logs_for(target.id).await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_handler_times_out_as_failure() {
    let store = MemoryStore::new();
    let integration = store.seed_integration(Uuid::new_v4(), "scripted").await;
    let target = store.seed_target(&integration, true).await;
    let publisher = publish_service(&store, LocatorTable::new(), Duration::from_millis(50));
    publisher.registry().register(
        "scripted",
        handler_factory(|| ScriptedHandler {
            result: Ok(None),
            delay: Some(Duration::from_secs(60)),
            calls: Arc::new(AtomicUsize::new(0)),
        }),
    );

    let report = publisher
        .attempt_publish(target.id, json!({}))
        .await
        .expect("attempt");

    assert!(matches!(
        report.outcome,
        AttemptOutcome::Failed {
            kind: FailureKind::HandlerTimeout,
            ..
        }
    ));
    let logs = store.logs_for(target.id).await;
    assert_eq!(logs[0].error_kind, Some(FailureKind::HandlerTimeout));
}
