use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::content::ContentRef;
use super::types::{FailureKind, IntegrationStatus, PublishLogStatus, PublishTargetStatus};

/// Catalog entry describing one integration type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationDefinitionRecord {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub category: String,
    pub description: String,
    /// JSON schema for integration credentials. Enforced keywords:
    /// `required`, `additionalProperties: false`, and per property `type`,
    /// `enum`, `minLength`, `maxLength` and `format: uri`. Anything else is
    /// stored and shown to clients but not checked.
    pub config_schema: Value,
    pub publish_schema: Option<Value>,
    pub handler_locator: String,
    pub is_active: bool,
    pub version: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A user-owned, configured instance of a definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub definition_id: Uuid,
    /// Code of the owning definition; handlers are resolved by it.
    pub definition_code: String,
    pub title: String,
    pub credentials: Value,
    pub status: IntegrationStatus,
    pub last_error: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishTargetRecord {
    pub id: Uuid,
    pub integration_id: Uuid,
    pub publish_settings: Value,
    pub is_enabled: bool,
    pub status: PublishTargetStatus,
    pub scheduled_at: Option<OffsetDateTime>,
    pub last_published_at: Option<OffsetDateTime>,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub content: ContentRef,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// The `(status, retry_count)` pair a target had when an attempt started.
///
/// Stores only apply an attempt's mutation while the persisted row still
/// carries this revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetRevision {
    pub status: PublishTargetStatus,
    pub retry_count: i32,
}

impl PublishTargetRecord {
    pub fn revision(&self) -> TargetRevision {
        TargetRevision {
            status: self.status,
            retry_count: self.retry_count,
        }
    }

    /// Disabled and already-delivered targets are skipped without a trace.
    pub fn is_publishable(&self) -> bool {
        self.is_enabled && self.status != PublishTargetStatus::Published
    }

    pub fn mark_published(&mut self, at: OffsetDateTime) {
        self.status = PublishTargetStatus::Published;
        self.last_published_at = Some(at);
        self.retry_count = 0;
        self.last_error = None;
        self.updated_at = at;
    }

    pub fn mark_failed(&mut self, message: impl Into<String>, at: OffsetDateTime) {
        self.status = PublishTargetStatus::Failed;
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_error = Some(message.into());
        self.updated_at = at;
    }
}

/// Immutable record of one publish attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishLogRecord {
    pub id: Uuid,
    pub publish_target_id: Uuid,
    pub request_payload: Value,
    pub response_payload: Option<Value>,
    pub status: PublishLogStatus,
    pub error_kind: Option<FailureKind>,
    pub error_message: String,
    pub created_at: OffsetDateTime,
}

impl PublishLogRecord {
    pub fn success(
        publish_target_id: Uuid,
        request_payload: Value,
        response_payload: Option<Value>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            publish_target_id,
            request_payload,
            response_payload,
            status: PublishLogStatus::Success,
            error_kind: None,
            error_message: String::new(),
            created_at,
        }
    }

    pub fn failure(
        publish_target_id: Uuid,
        request_payload: Value,
        kind: FailureKind,
        message: impl Into<String>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            publish_target_id,
            request_payload,
            response_payload: None,
            status: PublishLogStatus::Error,
            error_kind: Some(kind),
            error_message: message.into(),
            created_at,
        }
    }
}
