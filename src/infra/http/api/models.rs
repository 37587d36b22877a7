//! Conversions from stored records to the wire shapes in `inkwire-api-types`.

use serde::Deserialize;
use uuid::Uuid;

pub use inkwire_api_types::{
    CreateIntegrationRequest, CreatePublishTargetRequest, IntegrationDefinitionView,
    IntegrationView, PublishAttemptView, PublishLogPage, PublishLogView, PublishTargetView,
    SetEnabledRequest, UpdateIntegrationRequest,
};

use crate::application::integrations::{IntegrationChanges, NewIntegration};
use crate::application::pagination::CursorPage;
use crate::application::publish::{AttemptOutcome, AttemptReport};
use crate::application::targets::NewPublishTarget;
use crate::domain::entities::{
    IntegrationDefinitionRecord, IntegrationRecord, PublishLogRecord, PublishTargetRecord,
};

#[derive(Debug, Deserialize)]
pub struct IntegrationListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PublishTargetListQuery {
    pub content_kind: Option<String>,
    pub object_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct LogListQuery {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

impl From<IntegrationDefinitionRecord> for IntegrationDefinitionView {
    fn from(record: IntegrationDefinitionRecord) -> Self {
        Self {
            id: record.id,
            code: record.code,
            name: record.name,
            category: record.category,
            description: record.description,
            config_schema: record.config_schema,
            publish_schema: record.publish_schema,
            version: record.version,
        }
    }
}

impl From<IntegrationRecord> for IntegrationView {
    fn from(record: IntegrationRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            definition_code: record.definition_code,
            status: record.status,
            last_error: record.last_error,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<PublishTargetRecord> for PublishTargetView {
    fn from(record: PublishTargetRecord) -> Self {
        Self {
            id: record.id,
            integration_id: record.integration_id,
            content_kind: record.content.kind().to_string(),
            object_id: record.content.object_id(),
            publish_settings: record.publish_settings,
            is_enabled: record.is_enabled,
            status: record.status,
            scheduled_at: record.scheduled_at,
            last_published_at: record.last_published_at,
            retry_count: record.retry_count,
            last_error: record.last_error,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<PublishLogRecord> for PublishLogView {
    fn from(record: PublishLogRecord) -> Self {
        Self {
            id: record.id,
            status: record.status,
            error_kind: record.error_kind.map(|kind| kind.as_str().to_string()),
            error_message: record.error_message,
            request_payload: record.request_payload,
            response_payload: record.response_payload,
            created_at: record.created_at,
        }
    }
}

impl From<AttemptReport> for PublishAttemptView {
    fn from(report: AttemptReport) -> Self {
        let outcome = report.outcome.label().to_string();
        let (reason, error_message) = match report.outcome {
            AttemptOutcome::Skipped(reason) => (Some(reason.as_str().to_string()), None),
            AttemptOutcome::Published => (None, None),
            AttemptOutcome::Failed { kind, message } => {
                (Some(kind.as_str().to_string()), Some(message))
            }
        };
        Self {
            outcome,
            reason,
            error_message,
            target: report.target.into(),
        }
    }
}

pub fn log_page(page: CursorPage<PublishLogRecord>) -> PublishLogPage {
    let page = page.map(PublishLogView::from);
    PublishLogPage {
        items: page.items,
        next_cursor: page.next_cursor,
    }
}

pub fn new_integration(request: CreateIntegrationRequest) -> NewIntegration {
    NewIntegration {
        title: request.title,
        definition_id: request.definition_id,
        credentials: request.credentials,
    }
}

pub fn integration_changes(request: UpdateIntegrationRequest) -> IntegrationChanges {
    IntegrationChanges {
        title: request.title,
        credentials: request.credentials,
    }
}

pub fn new_publish_target(request: CreatePublishTargetRequest) -> NewPublishTarget {
    NewPublishTarget {
        integration_id: request.integration_id,
        content_kind: request.content_kind,
        object_id: request.object_id,
        publish_settings: request.publish_settings,
        is_enabled: request.is_enabled,
        scheduled_at: request.scheduled_at,
    }
}
