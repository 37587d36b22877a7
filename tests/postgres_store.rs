//! Postgres-backed repository checks. Run with `DATABASE_URL` set and
//! `cargo test -- --ignored`.

use serde_json::json;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use inkwire::application::pagination::{PageRequest, PublishLogCursor};
use inkwire::application::repos::{
    CreateIntegrationParams, CreatePublishTargetParams, DefinitionsRepo, IntegrationQueryFilter,
    IntegrationsRepo, PublishAttemptStore, PublishLogsRepo, PublishTargetQueryFilter,
    PublishTargetsRepo, RepoError, UpdateIntegrationParams,
};
use inkwire::domain::content::ContentRef;
use inkwire::domain::entities::{PublishLogRecord, PublishTargetRecord};
use inkwire::domain::types::{FailureKind, IntegrationStatus, PublishTargetStatus};
use inkwire::infra::db::PostgresRepositories;

const WEBHOOK_DEFINITION_ID: Uuid = uuid::uuid!("6f1d3c1e-2b7a-4c55-9f3e-0a8d5b2c7e41");

async fn seed_target(repos: &PostgresRepositories, owner_id: Uuid) -> PublishTargetRecord {
    let integration = repos
        .create_integration(CreateIntegrationParams {
            owner_id,
            definition_id: WEBHOOK_DEFINITION_ID,
            title: "Hook".to_string(),
            credentials: json!({"url": "https://hooks.example.com/in"}),
        })
        .await
        .expect("integration");
    assert_eq!(integration.definition_code, "webhook");

    repos
        .create_target(CreatePublishTargetParams {
            integration_id: integration.id,
            content: ContentRef::new("blog.note", Uuid::new_v4()).unwrap(),
            publish_settings: json!({}),
            is_enabled: true,
            scheduled_at: None,
        })
        .await
        .expect("target")
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn seeded_webhook_definition_is_listed(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);

    let active = repos.list_active().await.expect("list");
    assert!(active.iter().any(|definition| definition.code == "webhook"));

    let webhook = repos
        .find_by_code("webhook")
        .await
        .expect("lookup")
        .expect("seeded");
    assert_eq!(webhook.handler_locator, "inkwire::handlers::webhook");

    assert!(repos.deactivate("webhook").await.expect("deactivate"));
    assert!(repos.list_active().await.expect("list").is_empty());
    assert!(!repos.deactivate("missing").await.expect("deactivate"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn attempt_writes_target_and_log_together(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let owner = Uuid::new_v4();
    let target = seed_target(&repos, owner).await;

    let expected = target.revision();
    let mut failed = target.clone();
    let now = OffsetDateTime::now_utc();
    failed.mark_failed("boom", now);
    let log = PublishLogRecord::failure(
        target.id,
        json!({"n": 1}),
        FailureKind::HandlerPublish,
        "boom",
        now,
    );
    repos
        .record_attempt(expected, &failed, &log)
        .await
        .expect("record attempt");

    let stored = PublishTargetsRepo::find_by_id(&repos, target.id)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(stored.status, PublishTargetStatus::Failed);
    assert_eq!(stored.retry_count, 1);
    assert_eq!(stored.last_error.as_deref(), Some("boom"));

    let page = repos
        .list_for_target(target.id, PageRequest::new(10, None))
        .await
        .expect("logs");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].error_kind, Some(FailureKind::HandlerPublish));

    // Replaying against the stale revision must not write anything.
    let stale_log = PublishLogRecord::failure(
        target.id,
        json!({"n": 2}),
        FailureKind::HandlerPublish,
        "boom",
        OffsetDateTime::now_utc(),
    );
    let err = repos
        .record_attempt(expected, &failed, &stale_log)
        .await
        .expect_err("stale revision");
    assert!(matches!(err, RepoError::Conflict { .. }));

    let page = repos
        .list_for_target(target.id, PageRequest::new(10, None))
        .await
        .expect("logs");
    assert_eq!(page.items.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn logs_paginate_newest_first(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let target = seed_target(&repos, Uuid::new_v4()).await;

    let mut current = target.clone();
    for n in 0..3 {
        let expected = current.revision();
        let mut next = current.clone();
        let at = OffsetDateTime::now_utc();
        next.mark_failed(format!("attempt {n}"), at);
        let log = PublishLogRecord::failure(
            target.id,
            json!({"n": n}),
            FailureKind::HandlerPublish,
            format!("attempt {n}"),
            at,
        );
        repos
            .record_attempt(expected, &next, &log)
            .await
            .expect("record");
        current = next;
    }

    let first = repos
        .list_for_target(target.id, PageRequest::new(2, None))
        .await
        .expect("first page");
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].error_message, "attempt 2");
    let cursor = PublishLogCursor::decode(first.next_cursor.as_deref().expect("cursor"))
        .expect("decode");

    let second = repos
        .list_for_target(target.id, PageRequest::new(2, Some(cursor)))
        .await
        .expect("second page");
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].error_message, "attempt 0");
    assert!(second.next_cursor.is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn targets_are_listed_per_owner(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let owner = Uuid::new_v4();
    let target = seed_target(&repos, owner).await;
    seed_target(&repos, Uuid::new_v4()).await;

    let mine = PublishTargetsRepo::list_for_owner(
        &repos,
        owner,
        &PublishTargetQueryFilter {
            content_kind: Some("blog.note".to_string()),
            object_id: Some(target.content.object_id()),
        },
    )
    .await
    .expect("list");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, target.id);

    let disabled = repos.set_enabled(target.id, false).await.expect("toggle");
    assert!(!disabled.is_enabled);
    assert!(matches!(
        repos.set_enabled(Uuid::new_v4(), true).await,
        Err(RepoError::NotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn integrations_update_and_filter_by_status(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let owner = Uuid::new_v4();
    let integration = repos
        .create_integration(CreateIntegrationParams {
            owner_id: owner,
            definition_id: WEBHOOK_DEFINITION_ID,
            title: "Hook".to_string(),
            credentials: json!({"url": "https://hooks.example.com/in"}),
        })
        .await
        .expect("integration");

    let renamed = repos
        .update_integration(
            integration.id,
            UpdateIntegrationParams {
                title: Some("Renamed".to_string()),
                credentials: None,
            },
        )
        .await
        .expect("update");
    assert_eq!(renamed.title, "Renamed");
    assert_eq!(renamed.credentials, integration.credentials);
    assert_eq!(renamed.definition_code, "webhook");
    assert!(matches!(
        repos
            .update_integration(Uuid::new_v4(), UpdateIntegrationParams::default())
            .await,
        Err(RepoError::NotFound)
    ));

    sqlx::query("UPDATE integrations SET status = 'error' WHERE id = $1")
        .bind(integration.id)
        .execute(&pool)
        .await
        .expect("status");

    let failing = IntegrationsRepo::list_for_owner(
        &repos,
        owner,
        &IntegrationQueryFilter {
            status: Some(IntegrationStatus::Error),
        },
    )
    .await
    .expect("list");
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].id, integration.id);

    let active = IntegrationsRepo::list_for_owner(
        &repos,
        owner,
        &IntegrationQueryFilter {
            status: Some(IntegrationStatus::Active),
        },
    )
    .await
    .expect("list");
    assert!(active.is_empty());
}
