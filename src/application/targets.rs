//! Owner-scoped management of publish targets.
//!
//! Everything here checks that the caller owns the target's integration
//! before touching it. Targets that belong to someone else are reported as
//! missing.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::content::{ContentError, ContentResolver};
use crate::application::pagination::{CursorPage, PageRequest, PublishLogCursor};
use crate::application::publish::{AttemptReport, PublishError, PublishService};
use crate::application::repos::{
    CreatePublishTargetParams, IntegrationsRepo, PublishLogsRepo, PublishTargetQueryFilter,
    PublishTargetsRepo, RepoError,
};
use crate::domain::content::ContentRef;
use crate::domain::entities::{IntegrationRecord, PublishLogRecord, PublishTargetRecord};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum PublishTargetServiceError {
    #[error("publish target not found")]
    NotFound,
    #[error("target is disabled")]
    Disabled,
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct NewPublishTarget {
    pub integration_id: Uuid,
    pub content_kind: String,
    pub object_id: String,
    pub publish_settings: Option<Value>,
    pub is_enabled: Option<bool>,
    pub scheduled_at: Option<OffsetDateTime>,
}

#[derive(Clone)]
pub struct PublishTargetService {
    integrations: Arc<dyn IntegrationsRepo>,
    targets: Arc<dyn PublishTargetsRepo>,
    logs: Arc<dyn PublishLogsRepo>,
    content: Arc<dyn ContentResolver>,
    publisher: Arc<PublishService>,
}

impl PublishTargetService {
    pub fn new(
        integrations: Arc<dyn IntegrationsRepo>,
        targets: Arc<dyn PublishTargetsRepo>,
        logs: Arc<dyn PublishLogsRepo>,
        content: Arc<dyn ContentResolver>,
        publisher: Arc<PublishService>,
    ) -> Self {
        Self {
            integrations,
            targets,
            logs,
            content,
            publisher,
        }
    }

    pub async fn create(
        &self,
        owner_id: Uuid,
        input: NewPublishTarget,
    ) -> Result<PublishTargetRecord, PublishTargetServiceError> {
        let integration = self
            .integrations
            .find_by_id(input.integration_id)
            .await?
            .filter(|integration| integration.owner_id == owner_id)
            .ok_or_else(|| {
                DomainError::validation(
                    "integration_id",
                    "integration does not belong to the current user",
                )
            })?;

        let content = ContentRef::parse(&input.content_kind, &input.object_id)?;
        self.content.resolve(owner_id, &content).await?;

        let publish_settings = match input.publish_settings {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(settings @ Value::Object(_)) => settings,
            Some(_) => {
                return Err(DomainError::validation(
                    "publish_settings",
                    "must be a JSON object",
                )
                .into());
            }
        };

        let record = self
            .targets
            .create_target(CreatePublishTargetParams {
                integration_id: integration.id,
                content,
                publish_settings,
                is_enabled: input.is_enabled.unwrap_or(true),
                scheduled_at: input.scheduled_at,
            })
            .await?;

        info!(
            target = "application::targets::create",
            target_id = %record.id,
            integration_id = %integration.id,
            content = %record.content,
            "publish target created"
        );

        Ok(record)
    }

    pub async fn get(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<PublishTargetRecord, PublishTargetServiceError> {
        let (target, _) = self.owned_target(owner_id, id).await?;
        Ok(target)
    }

    pub async fn list_for_owner(
        &self,
        owner_id: Uuid,
        filter: &PublishTargetQueryFilter,
    ) -> Result<Vec<PublishTargetRecord>, PublishTargetServiceError> {
        self.targets
            .list_for_owner(owner_id, filter)
            .await
            .map_err(PublishTargetServiceError::from)
    }

    pub async fn set_enabled(
        &self,
        owner_id: Uuid,
        id: Uuid,
        is_enabled: bool,
    ) -> Result<PublishTargetRecord, PublishTargetServiceError> {
        self.owned_target(owner_id, id).await?;
        let record = self.targets.set_enabled(id, is_enabled).await?;
        info!(
            target = "application::targets::set_enabled",
            target_id = %id,
            is_enabled,
            "publish target toggled"
        );
        Ok(record)
    }

    /// Runs one attempt on behalf of `owner_id`.
    ///
    /// Unlike the underlying publish service, a disabled target is reported
    /// back to the caller instead of being skipped.
    pub async fn publish(
        &self,
        owner_id: Uuid,
        id: Uuid,
        content: Value,
    ) -> Result<AttemptReport, PublishTargetServiceError> {
        let (target, _) = self.owned_target(owner_id, id).await?;
        if !target.is_enabled {
            return Err(PublishTargetServiceError::Disabled);
        }
        self.publisher
            .attempt_publish(id, content)
            .await
            .map_err(PublishTargetServiceError::from)
    }

    pub async fn list_logs(
        &self,
        owner_id: Uuid,
        id: Uuid,
        page: PageRequest<PublishLogCursor>,
    ) -> Result<CursorPage<PublishLogRecord>, PublishTargetServiceError> {
        self.owned_target(owner_id, id).await?;
        self.logs
            .list_for_target(id, page)
            .await
            .map_err(PublishTargetServiceError::from)
    }

    async fn owned_target(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<(PublishTargetRecord, IntegrationRecord), PublishTargetServiceError> {
        let target = self
            .targets
            .find_by_id(id)
            .await?
            .ok_or(PublishTargetServiceError::NotFound)?;
        let integration = self
            .integrations
            .find_by_id(target.integration_id)
            .await?
            .filter(|integration| integration.owner_id == owner_id)
            .ok_or(PublishTargetServiceError::NotFound)?;
        Ok((target, integration))
    }
}
