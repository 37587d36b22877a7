use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{DefinitionsRepo, RepoError},
    domain::entities::IntegrationDefinitionRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const DEFINITION_COLUMNS: &str = "id, code, name, category, description, config_schema, \
     publish_schema, handler_locator, is_active, version, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct DefinitionRow {
    id: Uuid,
    code: String,
    name: String,
    category: String,
    description: String,
    config_schema: Value,
    publish_schema: Option<Value>,
    handler_locator: String,
    is_active: bool,
    version: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<DefinitionRow> for IntegrationDefinitionRecord {
    fn from(row: DefinitionRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            name: row.name,
            category: row.category,
            description: row.description,
            config_schema: row.config_schema,
            publish_schema: row.publish_schema,
            handler_locator: row.handler_locator,
            is_active: row.is_active,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl DefinitionsRepo for PostgresRepositories {
    async fn list_active(&self) -> Result<Vec<IntegrationDefinitionRecord>, RepoError> {
        let sql = format!(
            "SELECT {DEFINITION_COLUMNS} FROM integration_definitions \
             WHERE is_active ORDER BY name ASC, code ASC"
        );
        let rows = sqlx::query_as::<_, DefinitionRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<IntegrationDefinitionRecord>, RepoError> {
        let sql = format!("SELECT {DEFINITION_COLUMNS} FROM integration_definitions WHERE id = $1");
        let row = sqlx::query_as::<_, DefinitionRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<IntegrationDefinitionRecord>, RepoError> {
        let sql =
            format!("SELECT {DEFINITION_COLUMNS} FROM integration_definitions WHERE code = $1");
        let row = sqlx::query_as::<_, DefinitionRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn deactivate(&self, code: &str) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE integration_definitions SET is_active = FALSE, updated_at = now() \
             WHERE code = $1",
        )
        .bind(code)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
