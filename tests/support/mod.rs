#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use inkwire::application::catalog::CatalogService;
use inkwire::application::content::KnownKindsResolver;
use inkwire::application::integrations::IntegrationService;
use inkwire::application::pagination::{CursorPage, PageRequest, PublishLogCursor};
use inkwire::application::publish::{
    HandlerError, HandlerRegistry, LocatorTable, PublishHandler, PublishService,
};
use inkwire::application::repos::{
    CreateIntegrationParams, CreatePublishTargetParams, DefinitionsRepo, IntegrationQueryFilter,
    IntegrationsRepo, PublishAttemptStore, PublishLogsRepo, PublishTargetQueryFilter,
    PublishTargetsRepo, RepoError, UpdateIntegrationParams,
};
use inkwire::application::targets::PublishTargetService;
use inkwire::domain::content::ContentRef;
use inkwire::domain::entities::{
    IntegrationDefinitionRecord, IntegrationRecord, PublishLogRecord, PublishTargetRecord,
    TargetRevision,
};
use inkwire::domain::types::{IntegrationStatus, PublishTargetStatus};
use inkwire::infra::http::ApiState;

/// In-memory stand-in for every repository the services need.
#[derive(Default)]
pub struct MemoryStore {
    definitions: Mutex<Vec<IntegrationDefinitionRecord>>,
    integrations: Mutex<HashMap<Uuid, IntegrationRecord>>,
    targets: Mutex<HashMap<Uuid, PublishTargetRecord>>,
    logs: Mutex<Vec<PublishLogRecord>>,
    definition_lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn seed_definition(&self, code: &str, locator: &str) -> IntegrationDefinitionRecord {
        let now = OffsetDateTime::now_utc();
        let record = IntegrationDefinitionRecord {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: code.to_string(),
            category: "test".to_string(),
            description: String::new(),
            config_schema: json!({
                "type": "object",
                "required": ["url"],
                "properties": {"url": {"type": "string", "format": "uri"}}
            }),
            publish_schema: None,
            handler_locator: locator.to_string(),
            is_active: true,
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        };
        self.definitions.lock().await.push(record.clone());
        record
    }

    pub async fn seed_integration(&self, owner_id: Uuid, code: &str) -> IntegrationRecord {
        self.seed_integration_with(
            owner_id,
            code,
            json!({"url": "https://hooks.example.com/inkwire"}),
        )
        .await
    }

    pub async fn seed_integration_with(
        &self,
        owner_id: Uuid,
        code: &str,
        credentials: Value,
    ) -> IntegrationRecord {
        let now = OffsetDateTime::now_utc();
        let record = IntegrationRecord {
            id: Uuid::new_v4(),
            owner_id,
            definition_id: Uuid::new_v4(),
            definition_code: code.to_string(),
            title: format!("{code} integration"),
            credentials,
            status: IntegrationStatus::Active,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        self.integrations
            .lock()
            .await
            .insert(record.id, record.clone());
        record
    }

    pub async fn seed_target(
        &self,
        integration: &IntegrationRecord,
        is_enabled: bool,
    ) -> PublishTargetRecord {
        let now = OffsetDateTime::now_utc();
        let record = PublishTargetRecord {
            id: Uuid::new_v4(),
            integration_id: integration.id,
            publish_settings: json!({}),
            is_enabled,
            status: PublishTargetStatus::Draft,
            scheduled_at: None,
            last_published_at: None,
            retry_count: 0,
            last_error: None,
            content: ContentRef::new("blog.note", Uuid::new_v4()).unwrap(),
            created_at: now,
            updated_at: now,
        };
        self.targets.lock().await.insert(record.id, record.clone());
        record
    }

    pub async fn set_integration_status(&self, id: Uuid, status: IntegrationStatus) {
        if let Some(integration) = self.integrations.lock().await.get_mut(&id) {
            integration.status = status;
        }
    }

    pub async fn integration(&self, id: Uuid) -> IntegrationRecord {
        self.integrations
            .lock()
            .await
            .get(&id)
            .cloned()
            .expect("integration should exist")
    }

    pub async fn target(&self, id: Uuid) -> PublishTargetRecord {
        self.targets
            .lock()
            .await
            .get(&id)
            .cloned()
            .expect("target should exist")
    }

    pub async fn logs_for(&self, target_id: Uuid) -> Vec<PublishLogRecord> {
        self.logs
            .lock()
            .await
            .iter()
            .filter(|log| log.publish_target_id == target_id)
            .cloned()
            .collect()
    }

    pub fn definition_lookups(&self) -> usize {
        self.definition_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DefinitionsRepo for MemoryStore {
    async fn list_active(&self) -> Result<Vec<IntegrationDefinitionRecord>, RepoError> {
        let mut active: Vec<_> = self
            .definitions
            .lock()
            .await
            .iter()
            .filter(|definition| definition.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        Ok(active)
    }

    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<IntegrationDefinitionRecord>, RepoError> {
        Ok(self
            .definitions
            .lock()
            .await
            .iter()
            .find(|definition| definition.id == id)
            .cloned())
    }

    async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<IntegrationDefinitionRecord>, RepoError> {
        self.definition_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .definitions
            .lock()
            .await
            .iter()
            .find(|definition| definition.code == code)
            .cloned())
    }

    async fn deactivate(&self, code: &str) -> Result<bool, RepoError> {
        let mut definitions = self.definitions.lock().await;
        match definitions.iter_mut().find(|definition| definition.code == code) {
            Some(definition) => {
                definition.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl IntegrationsRepo for MemoryStore {
    async fn create_integration(
        &self,
        params: CreateIntegrationParams,
    ) -> Result<IntegrationRecord, RepoError> {
        let code = self
            .definitions
            .lock()
            .await
            .iter()
            .find(|definition| definition.id == params.definition_id)
            .map(|definition| definition.code.clone())
            .ok_or(RepoError::NotFound)?;
        let now = OffsetDateTime::now_utc();
        let record = IntegrationRecord {
            id: Uuid::new_v4(),
            owner_id: params.owner_id,
            definition_id: params.definition_id,
            definition_code: code,
            title: params.title,
            credentials: params.credentials,
            status: IntegrationStatus::Active,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        self.integrations
            .lock()
            .await
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IntegrationRecord>, RepoError> {
        Ok(self.integrations.lock().await.get(&id).cloned())
    }

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        filter: &IntegrationQueryFilter,
    ) -> Result<Vec<IntegrationRecord>, RepoError> {
        let mut integrations: Vec<_> = self
            .integrations
            .lock()
            .await
            .values()
            .filter(|integration| integration.owner_id == owner_id)
            .filter(|integration| filter.status.is_none_or(|status| integration.status == status))
            .cloned()
            .collect();
        integrations.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(integrations)
    }

    async fn update_integration(
        &self,
        id: Uuid,
        params: UpdateIntegrationParams,
    ) -> Result<IntegrationRecord, RepoError> {
        let mut integrations = self.integrations.lock().await;
        let integration = integrations.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(title) = params.title {
            integration.title = title;
        }
        if let Some(credentials) = params.credentials {
            integration.credentials = credentials;
        }
        integration.updated_at = OffsetDateTime::now_utc();
        Ok(integration.clone())
    }
}

#[async_trait]
impl PublishTargetsRepo for MemoryStore {
    async fn create_target(
        &self,
        params: CreatePublishTargetParams,
    ) -> Result<PublishTargetRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = PublishTargetRecord {
            id: Uuid::new_v4(),
            integration_id: params.integration_id,
            publish_settings: params.publish_settings,
            is_enabled: params.is_enabled,
            status: PublishTargetStatus::Draft,
            scheduled_at: params.scheduled_at,
            last_published_at: None,
            retry_count: 0,
            last_error: None,
            content: params.content,
            created_at: now,
            updated_at: now,
        };
        self.targets.lock().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PublishTargetRecord>, RepoError> {
        Ok(self.targets.lock().await.get(&id).cloned())
    }

    async fn list_for_owner(
        &self,
        owner_id: Uuid,
        filter: &PublishTargetQueryFilter,
    ) -> Result<Vec<PublishTargetRecord>, RepoError> {
        let owned: Vec<Uuid> = self
            .integrations
            .lock()
            .await
            .values()
            .filter(|integration| integration.owner_id == owner_id)
            .map(|integration| integration.id)
            .collect();
        let mut targets: Vec<_> = self
            .targets
            .lock()
            .await
            .values()
            .filter(|target| owned.contains(&target.integration_id))
            .filter(|target| {
                filter
                    .content_kind
                    .as_deref()
                    .is_none_or(|kind| target.content.kind() == kind)
            })
            .filter(|target| {
                filter
                    .object_id
                    .is_none_or(|object_id| target.content.object_id() == object_id)
            })
            .cloned()
            .collect();
        targets.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(targets)
    }

    async fn set_enabled(
        &self,
        id: Uuid,
        is_enabled: bool,
    ) -> Result<PublishTargetRecord, RepoError> {
        let mut targets = self.targets.lock().await;
        let target = targets.get_mut(&id).ok_or(RepoError::NotFound)?;
        target.is_enabled = is_enabled;
        target.updated_at = OffsetDateTime::now_utc();
        Ok(target.clone())
    }
}

#[async_trait]
impl PublishLogsRepo for MemoryStore {
    async fn list_for_target(
        &self,
        target_id: Uuid,
        page: PageRequest<PublishLogCursor>,
    ) -> Result<CursorPage<PublishLogRecord>, RepoError> {
        let mut logs = self.logs_for(target_id).await;
        logs.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        let items: Vec<_> = logs
            .into_iter()
            .filter(|log| {
                page.cursor
                    .as_ref()
                    .is_none_or(|cursor| cursor.precedes(log.created_at, log.id))
            })
            .take(page.limit as usize)
            .collect();
        let next_cursor = if items.len() as u32 == page.limit {
            items
                .last()
                .map(|log| PublishLogCursor::new(log.created_at, log.id).encode())
        } else {
            None
        };
        Ok(CursorPage::new(items, next_cursor))
    }
}

#[async_trait]
impl PublishAttemptStore for MemoryStore {
    async fn record_attempt(
        &self,
        expected: TargetRevision,
        target: &PublishTargetRecord,
        log: &PublishLogRecord,
    ) -> Result<(), RepoError> {
        let mut targets = self.targets.lock().await;
        let mut logs = self.logs.lock().await;
        let current = targets.get_mut(&target.id).ok_or(RepoError::NotFound)?;
        if current.revision() != expected {
            return Err(RepoError::Conflict {
                entity: "publish_target",
                id: target.id,
            });
        }
        *current = target.clone();
        logs.push(log.clone());
        Ok(())
    }
}

/// Handler that records what it was asked to deliver and replies with a
/// fixed result.
pub struct ScriptedHandler {
    pub result: Result<Option<Value>, String>,
    pub delay: Option<Duration>,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedHandler {
    pub fn succeeding(response: Value) -> Self {
        Self {
            result: Ok(Some(response)),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl PublishHandler for ScriptedHandler {
    async fn publish(
        &self,
        _integration: &IntegrationRecord,
        _target: &PublishTargetRecord,
        _content: &Value,
    ) -> Result<Option<Value>, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone().map_err(HandlerError::delivery)
    }
}

pub fn publish_service(
    store: &Arc<MemoryStore>,
    locators: LocatorTable,
    handler_timeout: Duration,
) -> Arc<PublishService> {
    let registry = Arc::new(HandlerRegistry::new(store.clone(), locators));
    Arc::new(PublishService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        registry,
        handler_timeout,
    ))
}

pub fn api_state(store: &Arc<MemoryStore>, publisher: Arc<PublishService>) -> ApiState {
    ApiState {
        catalog: Arc::new(CatalogService::new(store.clone())),
        integrations: Arc::new(IntegrationService::new(store.clone(), store.clone())),
        targets: Arc::new(PublishTargetService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(KnownKindsResolver::new(["blog.blog", "blog.note"])),
            publisher,
        )),
    }
}
