//! Shared request and response types for the inkwire publish-integration API.
//!
//! The enum spellings returned by `as_str` are also the values persisted in
//! Postgres text columns, so the server and API clients agree on one spelling.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle state of a publish target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishTargetStatus {
    Draft,
    Queued,
    Published,
    Failed,
}

impl PublishTargetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PublishTargetStatus::Draft => "draft",
            PublishTargetStatus::Queued => "queued",
            PublishTargetStatus::Published => "published",
            PublishTargetStatus::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for PublishTargetStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, ()> {
        match value {
            "draft" => Ok(PublishTargetStatus::Draft),
            "queued" => Ok(PublishTargetStatus::Queued),
            "published" => Ok(PublishTargetStatus::Published),
            "failed" => Ok(PublishTargetStatus::Failed),
            _ => Err(()),
        }
    }
}

/// Outcome recorded on a publish log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishLogStatus {
    Success,
    Error,
}

impl PublishLogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PublishLogStatus::Success => "success",
            PublishLogStatus::Error => "error",
        }
    }
}

impl TryFrom<&str> for PublishLogStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, ()> {
        match value {
            "success" => Ok(PublishLogStatus::Success),
            "error" => Ok(PublishLogStatus::Error),
            _ => Err(()),
        }
    }
}

/// Health of a user-configured integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    Active,
    Disabled,
    Error,
}

impl IntegrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IntegrationStatus::Active => "active",
            IntegrationStatus::Disabled => "disabled",
            IntegrationStatus::Error => "error",
        }
    }
}

impl TryFrom<&str> for IntegrationStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, ()> {
        match value {
            "active" => Ok(IntegrationStatus::Active),
            "disabled" => Ok(IntegrationStatus::Disabled),
            "error" => Ok(IntegrationStatus::Error),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationDefinitionView {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub config_schema: Value,
    pub publish_schema: Option<Value>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationView {
    pub id: Uuid,
    pub title: String,
    pub definition_code: String,
    pub status: IntegrationStatus,
    pub last_error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIntegrationRequest {
    pub title: String,
    pub definition_id: Uuid,
    #[serde(default)]
    pub credentials: Value,
}

/// Partial update of an integration; omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateIntegrationRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub credentials: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishTargetView {
    pub id: Uuid,
    pub integration_id: Uuid,
    pub content_kind: String,
    pub object_id: Uuid,
    pub publish_settings: Value,
    pub is_enabled: bool,
    pub status: PublishTargetStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_published_at: Option<OffsetDateTime>,
    pub retry_count: i32,
    pub last_error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// `object_id` stays a string so malformed identifiers reach validation
/// instead of failing JSON extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePublishTargetRequest {
    pub integration_id: Uuid,
    pub content_kind: String,
    pub object_id: String,
    #[serde(default)]
    pub publish_settings: Option<Value>,
    #[serde(default)]
    pub is_enabled: Option<bool>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetEnabledRequest {
    pub is_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishLogView {
    pub id: Uuid,
    pub status: PublishLogStatus,
    pub error_kind: Option<String>,
    pub error_message: String,
    pub request_payload: Value,
    pub response_payload: Option<Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishLogPage {
    pub items: Vec<PublishLogView>,
    pub next_cursor: Option<String>,
}

/// Result of one publish attempt triggered through the API.
///
/// `outcome` is `published`, `failed` or `skipped`; `reason` names the skip
/// reason or the failure kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishAttemptView {
    pub outcome: String,
    pub reason: Option<String>,
    pub error_message: Option<String>,
    pub target: PublishTargetView,
}
