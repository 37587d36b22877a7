//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{CursorPage, PageRequest, PaginationError, PublishLogCursor};
use crate::domain::content::ContentRef;
use crate::domain::entities::{
    IntegrationDefinitionRecord, IntegrationRecord, PublishLogRecord, PublishTargetRecord,
    TargetRevision,
};
use crate::domain::types::IntegrationStatus;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    /// A conditional write found the row in a different state than expected.
    #[error("concurrent modification of {entity} `{id}`")]
    Conflict { entity: &'static str, id: Uuid },
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PublishTargetQueryFilter {
    pub content_kind: Option<String>,
    pub object_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct IntegrationQueryFilter {
    pub status: Option<IntegrationStatus>,
}

#[derive(Debug, Clone)]
pub struct CreateIntegrationParams {
    pub owner_id: Uuid,
    pub definition_id: Uuid,
    pub title: String,
    pub credentials: Value,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateIntegrationParams {
    pub title: Option<String>,
    pub credentials: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct CreatePublishTargetParams {
    pub integration_id: Uuid,
    pub content: ContentRef,
    pub publish_settings: Value,
    pub is_enabled: bool,
    pub scheduled_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait DefinitionsRepo: Send + Sync {
    /// Active definitions ordered by name.
    async fn list_active(&self) -> Result<Vec<IntegrationDefinitionRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid)
    -> Result<Option<IntegrationDefinitionRecord>, RepoError>;

    async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<IntegrationDefinitionRecord>, RepoError>;

    /// Marks a definition inactive; returns `false` when no row matched.
    async fn deactivate(&self, code: &str) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait IntegrationsRepo: Send + Sync {
    async fn create_integration(
        &self,
        params: CreateIntegrationParams,
    ) -> Result<IntegrationRecord, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IntegrationRecord>, RepoError>;

    /// Newest first.
    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        filter: &IntegrationQueryFilter,
    ) -> Result<Vec<IntegrationRecord>, RepoError>;

    async fn update_integration(
        &self,
        id: Uuid,
        params: UpdateIntegrationParams,
    ) -> Result<IntegrationRecord, RepoError>;
}

#[async_trait]
pub trait PublishTargetsRepo: Send + Sync {
    async fn create_target(
        &self,
        params: CreatePublishTargetParams,
    ) -> Result<PublishTargetRecord, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PublishTargetRecord>, RepoError>;

    /// Targets whose integration belongs to `owner_id`, newest first.
    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        filter: &PublishTargetQueryFilter,
    ) -> Result<Vec<PublishTargetRecord>, RepoError>;

    async fn set_enabled(
        &self,
        id: Uuid,
        is_enabled: bool,
    ) -> Result<PublishTargetRecord, RepoError>;
}

#[async_trait]
pub trait PublishLogsRepo: Send + Sync {
    async fn list_for_target(
        &self,
        target_id: Uuid,
        page: PageRequest<PublishLogCursor>,
    ) -> Result<CursorPage<PublishLogRecord>, RepoError>;
}

/// Persists the outcome of one publish attempt.
///
/// Implementations must write the target mutation and the log row as a unit:
/// either both become visible or neither does. The target row is only
/// updated while it still carries `expected`; otherwise nothing is written
/// and `RepoError::Conflict` is returned.
#[async_trait]
pub trait PublishAttemptStore: Send + Sync {
    async fn record_attempt(
        &self,
        expected: TargetRevision,
        target: &PublishTargetRecord,
        log: &PublishLogRecord,
    ) -> Result<(), RepoError>;
}
