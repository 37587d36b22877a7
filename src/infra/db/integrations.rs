use std::convert::TryFrom;

use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreateIntegrationParams, IntegrationQueryFilter, IntegrationsRepo, RepoError,
        UpdateIntegrationParams,
    },
    domain::{entities::IntegrationRecord, types::IntegrationStatus},
};

use super::{PostgresRepositories, map_sqlx_error, util::decode_text_enum};

const INTEGRATION_SELECT: &str = "SELECT i.id, i.owner_id, i.definition_id, d.code AS definition_code, \
     i.title, i.credentials, i.status, i.last_error, i.created_at, i.updated_at \
     FROM integrations i \
     INNER JOIN integration_definitions d ON d.id = i.definition_id";

#[derive(sqlx::FromRow)]
struct IntegrationRow {
    id: Uuid,
    owner_id: Uuid,
    definition_id: Uuid,
    definition_code: String,
    title: String,
    credentials: Value,
    status: String,
    last_error: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<IntegrationRow> for IntegrationRecord {
    type Error = RepoError;

    fn try_from(row: IntegrationRow) -> Result<Self, Self::Error> {
        let status: IntegrationStatus = decode_text_enum("integrations.status", &row.status)?;
        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            definition_id: row.definition_id,
            definition_code: row.definition_code,
            title: row.title,
            credentials: row.credentials,
            status,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl IntegrationsRepo for PostgresRepositories {
    async fn create_integration(
        &self,
        params: CreateIntegrationParams,
    ) -> Result<IntegrationRecord, RepoError> {
        let row = sqlx::query_as::<_, IntegrationRow>(
            r#"
            WITH inserted AS (
                INSERT INTO integrations (id, owner_id, definition_id, title, credentials, status)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT i.id, i.owner_id, i.definition_id, d.code AS definition_code,
                   i.title, i.credentials, i.status, i.last_error, i.created_at, i.updated_at
            FROM inserted i
            INNER JOIN integration_definitions d ON d.id = i.definition_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.owner_id)
        .bind(params.definition_id)
        .bind(params.title)
        .bind(params.credentials)
        .bind(IntegrationStatus::Active.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        IntegrationRecord::try_from(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IntegrationRecord>, RepoError> {
        let sql = format!("{INTEGRATION_SELECT} WHERE i.id = $1");
        let row = sqlx::query_as::<_, IntegrationRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(IntegrationRecord::try_from).transpose()
    }

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        filter: &IntegrationQueryFilter,
    ) -> Result<Vec<IntegrationRecord>, RepoError> {
        let sql = format!(
            "{INTEGRATION_SELECT} WHERE i.owner_id = $1 AND ($2::TEXT IS NULL OR i.status = $2) \
             ORDER BY i.created_at DESC, i.id DESC"
        );
        let rows = sqlx::query_as::<_, IntegrationRow>(&sql)
            .bind(owner_id)
            .bind(filter.status.map(IntegrationStatus::as_str))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(IntegrationRecord::try_from).collect()
    }

    async fn update_integration(
        &self,
        id: Uuid,
        params: UpdateIntegrationParams,
    ) -> Result<IntegrationRecord, RepoError> {
        let row = sqlx::query_as::<_, IntegrationRow>(
            r#"
            WITH updated AS (
                UPDATE integrations
                SET title = COALESCE($2, title),
                    credentials = COALESCE($3, credentials),
                    updated_at = now()
                WHERE id = $1
                RETURNING *
            )
            SELECT i.id, i.owner_id, i.definition_id, d.code AS definition_code,
                   i.title, i.credentials, i.status, i.last_error, i.created_at, i.updated_at
            FROM updated i
            INNER JOIN integration_definitions d ON d.id = i.definition_id
            "#,
        )
        .bind(id)
        .bind(params.title)
        .bind(params.credentials)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(IntegrationRecord::try_from)
            .transpose()?
            .ok_or(RepoError::NotFound)
    }
}
