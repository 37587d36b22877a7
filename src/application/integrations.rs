use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::application::repos::{
    CreateIntegrationParams, DefinitionsRepo, IntegrationQueryFilter, IntegrationsRepo,
    RepoError, UpdateIntegrationParams,
};
use crate::domain::entities::{IntegrationDefinitionRecord, IntegrationRecord};
use crate::domain::error::DomainError;

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum IntegrationServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct NewIntegration {
    pub title: String,
    pub definition_id: Uuid,
    pub credentials: Value,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct IntegrationChanges {
    pub title: Option<String>,
    pub credentials: Option<Value>,
}

#[derive(Clone)]
pub struct IntegrationService {
    definitions: Arc<dyn DefinitionsRepo>,
    integrations: Arc<dyn IntegrationsRepo>,
}

impl IntegrationService {
    pub fn new(
        definitions: Arc<dyn DefinitionsRepo>,
        integrations: Arc<dyn IntegrationsRepo>,
    ) -> Self {
        Self {
            definitions,
            integrations,
        }
    }

    pub async fn create(
        &self,
        owner_id: Uuid,
        input: NewIntegration,
    ) -> Result<IntegrationRecord, IntegrationServiceError> {
        let title = validate_title(&input.title)?;
        let definition = self.active_definition(input.definition_id).await?;
        let credentials = validate_credentials(&definition.config_schema, input.credentials)?;

        let record = self
            .integrations
            .create_integration(CreateIntegrationParams {
                owner_id,
                definition_id: definition.id,
                title,
                credentials,
            })
            .await?;

        info!(
            target = "application::integrations::create",
            integration_id = %record.id,
            owner_id = %owner_id,
            code = %record.definition_code,
            "integration created"
        );

        Ok(record)
    }

    pub async fn list_for_owner(
        &self,
        owner_id: Uuid,
        filter: &IntegrationQueryFilter,
    ) -> Result<Vec<IntegrationRecord>, IntegrationServiceError> {
        self.integrations
            .list_for_owner(owner_id, filter)
            .await
            .map_err(IntegrationServiceError::from)
    }

    /// Updates the caller's integration. The definition must still be
    /// active, and new credentials are checked against its schema.
    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        changes: IntegrationChanges,
    ) -> Result<IntegrationRecord, IntegrationServiceError> {
        let current = self
            .integrations
            .find_by_id(id)
            .await?
            .filter(|integration| integration.owner_id == owner_id)
            .ok_or_else(|| DomainError::not_found("integration"))?;

        let title = changes.title.as_deref().map(validate_title).transpose()?;
        let definition = self.active_definition(current.definition_id).await?;
        let credentials = changes
            .credentials
            .map(|credentials| validate_credentials(&definition.config_schema, credentials))
            .transpose()?;

        let record = self
            .integrations
            .update_integration(id, UpdateIntegrationParams { title, credentials })
            .await?;

        info!(
            target = "application::integrations::update",
            integration_id = %record.id,
            owner_id = %owner_id,
            "integration updated"
        );

        Ok(record)
    }

    async fn active_definition(
        &self,
        definition_id: Uuid,
    ) -> Result<IntegrationDefinitionRecord, IntegrationServiceError> {
        let definition = self
            .definitions
            .find_by_id(definition_id)
            .await?
            .ok_or_else(|| {
                DomainError::validation("definition_id", "unknown integration definition")
            })?;
        if !definition.is_active {
            return Err(DomainError::validation(
                "definition_id",
                format!("integration definition `{}` is not active", definition.code),
            )
            .into());
        }
        Ok(definition)
    }
}

fn validate_title(raw: &str) -> Result<String, DomainError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(DomainError::validation("title", "this field is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(DomainError::validation(
            "title",
            format!("must be at most {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(title.to_string())
}

/// Checks credentials against a definition's `config_schema`.
///
/// Supported keywords: top-level `required` and `additionalProperties:
/// false`; per property `type` (any JSON type name), `enum`, `minLength`,
/// `maxLength` and `format: uri`. Other keywords are not enforced.
fn validate_credentials(schema: &Value, credentials: Value) -> Result<Value, DomainError> {
    let credentials = match credentials {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        _ => {
            return Err(DomainError::validation(
                "credentials",
                "must be a JSON object",
            ));
        }
    };

    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    for key in required {
        if credentials.get(key).is_none_or(Value::is_null) {
            return Err(invalid(format!("missing required key `{key}`")));
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
        let known = |key: &String| properties.is_some_and(|props| props.contains_key(key));
        if let Some(key) = credentials.keys().find(|key| !known(*key)) {
            return Err(invalid(format!("unexpected key `{key}`")));
        }
    }

    for (key, property) in properties.into_iter().flatten() {
        let Some(value) = credentials.get(key).filter(|value| !value.is_null()) else {
            continue;
        };
        check_property(key, property, value)?;
    }

    Ok(Value::Object(credentials))
}

fn check_property(key: &str, property: &Value, value: &Value) -> Result<(), DomainError> {
    if let Some(expected) = property.get("type").and_then(Value::as_str) {
        let matches = match expected {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "object" => value.is_object(),
            "array" => value.is_array(),
            _ => true,
        };
        if !matches {
            return Err(invalid(format!("`{key}` must be of type {expected}")));
        }
    }

    let allowed = property.get("enum").and_then(Value::as_array);
    if allowed.is_some_and(|allowed| !allowed.contains(value)) {
        return Err(invalid(format!("`{key}` is not one of the allowed values")));
    }

    let Some(text) = value.as_str() else {
        return Ok(());
    };
    let length = text.chars().count() as u64;
    let min = property.get("minLength").and_then(Value::as_u64);
    if let Some(min) = min.filter(|min| length < *min) {
        return Err(invalid(format!("`{key}` must be at least {min} characters")));
    }
    let max = property.get("maxLength").and_then(Value::as_u64);
    if let Some(max) = max.filter(|max| length > *max) {
        return Err(invalid(format!("`{key}` must be at most {max} characters")));
    }
    if property.get("format").and_then(Value::as_str) == Some("uri") && Url::parse(text).is_err()
    {
        return Err(invalid(format!("`{key}` must be a valid URL")));
    }
    Ok(())
}

fn invalid(message: String) -> DomainError {
    DomainError::validation("credentials", message)
}
