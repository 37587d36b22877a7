use std::convert::TryFrom;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreatePublishTargetParams, PublishTargetQueryFilter, PublishTargetsRepo, RepoError,
    },
    domain::{content::ContentRef, entities::PublishTargetRecord, types::PublishTargetStatus},
};

use super::{PostgresRepositories, map_sqlx_error, util::decode_text_enum};

const TARGET_COLUMNS: &str = "t.id, t.integration_id, t.publish_settings, t.is_enabled, \
     t.status, t.scheduled_at, t.last_published_at, t.retry_count, t.last_error, \
     t.content_kind, t.object_id, t.created_at, t.updated_at";

#[derive(sqlx::FromRow)]
struct TargetRow {
    id: Uuid,
    integration_id: Uuid,
    publish_settings: Value,
    is_enabled: bool,
    status: String,
    scheduled_at: Option<OffsetDateTime>,
    last_published_at: Option<OffsetDateTime>,
    retry_count: i32,
    last_error: Option<String>,
    content_kind: String,
    object_id: Uuid,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<TargetRow> for PublishTargetRecord {
    type Error = RepoError;

    fn try_from(row: TargetRow) -> Result<Self, Self::Error> {
        let status: PublishTargetStatus = decode_text_enum("publish_targets.status", &row.status)?;
        let id = row.id;
        let content = ContentRef::new(row.content_kind, row.object_id).map_err(|err| {
            RepoError::Integrity {
                message: format!("publish target `{id}` has a malformed content reference: {err}"),
            }
        })?;

        Ok(Self {
            id: row.id,
            integration_id: row.integration_id,
            publish_settings: row.publish_settings,
            is_enabled: row.is_enabled,
            status,
            scheduled_at: row.scheduled_at,
            last_published_at: row.last_published_at,
            retry_count: row.retry_count,
            last_error: row.last_error,
            content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl PublishTargetsRepo for PostgresRepositories {
    async fn create_target(
        &self,
        params: CreatePublishTargetParams,
    ) -> Result<PublishTargetRecord, RepoError> {
        let sql = format!(
            "INSERT INTO publish_targets AS t \
                 (id, integration_id, publish_settings, is_enabled, status, scheduled_at, \
                  content_kind, object_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {TARGET_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TargetRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.integration_id)
            .bind(params.publish_settings)
            .bind(params.is_enabled)
            .bind(PublishTargetStatus::Draft.as_str())
            .bind(params.scheduled_at)
            .bind(params.content.kind())
            .bind(params.content.object_id())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        PublishTargetRecord::try_from(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PublishTargetRecord>, RepoError> {
        let sql = format!("SELECT {TARGET_COLUMNS} FROM publish_targets t WHERE t.id = $1");
        let row = sqlx::query_as::<_, TargetRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(PublishTargetRecord::try_from).transpose()
    }

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        filter: &PublishTargetQueryFilter,
    ) -> Result<Vec<PublishTargetRecord>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(TARGET_COLUMNS);
        qb.push(
            " FROM publish_targets t \
             INNER JOIN integrations i ON i.id = t.integration_id \
             WHERE i.owner_id = ",
        );
        qb.push_bind(owner_id);

        if let Some(kind) = filter.content_kind.as_ref() {
            qb.push(" AND t.content_kind = ");
            qb.push_bind(kind);
        }

        if let Some(object_id) = filter.object_id {
            qb.push(" AND t.object_id = ");
            qb.push_bind(object_id);
        }

        qb.push(" ORDER BY t.created_at DESC, t.id DESC");

        let rows = qb
            .build_query_as::<TargetRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(PublishTargetRecord::try_from).collect()
    }

    async fn set_enabled(
        &self,
        id: Uuid,
        is_enabled: bool,
    ) -> Result<PublishTargetRecord, RepoError> {
        let sql = format!(
            "UPDATE publish_targets AS t SET is_enabled = $2, updated_at = now() \
             WHERE t.id = $1 RETURNING {TARGET_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TargetRow>(&sql)
            .bind(id)
            .bind(is_enabled)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        PublishTargetRecord::try_from(row)
    }
}
