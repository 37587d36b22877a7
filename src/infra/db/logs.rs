use std::convert::TryFrom;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::pagination::{CursorPage, PageRequest, PublishLogCursor},
    application::repos::{PublishAttemptStore, PublishLogsRepo, RepoError},
    domain::{
        entities::{PublishLogRecord, PublishTargetRecord, TargetRevision},
        types::{FailureKind, PublishLogStatus},
    },
};

use super::{PostgresRepositories, map_sqlx_error, util::decode_text_enum};

#[derive(sqlx::FromRow)]
struct PublishLogRow {
    id: Uuid,
    publish_target_id: Uuid,
    request_payload: Value,
    response_payload: Option<Value>,
    status: String,
    error_kind: Option<String>,
    error_message: String,
    created_at: OffsetDateTime,
}

impl TryFrom<PublishLogRow> for PublishLogRecord {
    type Error = RepoError;

    fn try_from(row: PublishLogRow) -> Result<Self, Self::Error> {
        let status: PublishLogStatus = decode_text_enum("publish_logs.status", &row.status)?;
        let error_kind = row
            .error_kind
            .as_deref()
            .map(|kind| decode_text_enum::<FailureKind>("publish_logs.error_kind", kind))
            .transpose()?;

        Ok(Self {
            id: row.id,
            publish_target_id: row.publish_target_id,
            request_payload: row.request_payload,
            response_payload: row.response_payload,
            status,
            error_kind,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl PublishLogsRepo for PostgresRepositories {
    async fn list_for_target(
        &self,
        target_id: Uuid,
        page: PageRequest<PublishLogCursor>,
    ) -> Result<CursorPage<PublishLogRecord>, RepoError> {
        let limit = page.limit.clamp(1, 200);
        let mut qb = QueryBuilder::new(
            "SELECT id, publish_target_id, request_payload, response_payload, status, \
             error_kind, error_message, created_at \
             FROM publish_logs WHERE publish_target_id = ",
        );
        qb.push_bind(target_id);

        if let Some(cursor) = page.cursor {
            qb.push(" AND (");
            qb.push("created_at < ");
            qb.push_bind(cursor.created_at());
            qb.push(" OR (created_at = ");
            qb.push_bind(cursor.created_at());
            qb.push(" AND id < ");
            qb.push_bind(cursor.id());
            qb.push("))");
        }

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(limit as i64);

        let rows = qb
            .build_query_as::<PublishLogRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let records = rows
            .into_iter()
            .map(PublishLogRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let next_cursor = if records.len() as u32 == limit {
            records
                .last()
                .map(|entry| PublishLogCursor::new(entry.created_at, entry.id).encode())
        } else {
            None
        };

        Ok(CursorPage::new(records, next_cursor))
    }
}

#[async_trait]
impl PublishAttemptStore for PostgresRepositories {
    async fn record_attempt(
        &self,
        expected: TargetRevision,
        target: &PublishTargetRecord,
        log: &PublishLogRecord,
    ) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let updated = sqlx::query(
            r#"
            UPDATE publish_targets
            SET status = $2,
                retry_count = $3,
                last_error = $4,
                last_published_at = $5,
                updated_at = $6
            WHERE id = $1 AND status = $7 AND retry_count = $8
            "#,
        )
        .bind(target.id)
        .bind(target.status.as_str())
        .bind(target.retry_count)
        .bind(target.last_error.as_deref())
        .bind(target.last_published_at)
        .bind(target.updated_at)
        .bind(expected.status.as_str())
        .bind(expected.retry_count)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(RepoError::Conflict {
                entity: "publish_target",
                id: target.id,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO publish_logs (
                id, publish_target_id, request_payload, response_payload,
                status, error_kind, error_message, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(log.id)
        .bind(log.publish_target_id)
        .bind(&log.request_payload)
        .bind(log.response_payload.as_ref())
        .bind(log.status.as_str())
        .bind(log.error_kind.map(FailureKind::as_str))
        .bind(&log.error_message)
        .bind(log.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
