//! One publish attempt against one target.
//!
//! An attempt reloads the target under a per-target lock, applies the
//! enabled/published guards, resolves the handler for the integration's
//! definition code, invokes it under a timeout and then persists the target
//! mutation together with exactly one log row. Delivery failures never
//! escape: they end up in `last_error` and the log. Only storage problems
//! and lost races are returned as errors.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use metrics::counter;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::repos::{
    IntegrationsRepo, PublishAttemptStore, PublishTargetsRepo, RepoError,
};
use crate::domain::entities::{IntegrationRecord, PublishLogRecord, PublishTargetRecord};
use crate::domain::types::{FailureKind, PublishTargetStatus};

use super::handler::PublishHandler;
use super::registry::{HandlerRegistry, ResolveError};

pub(crate) const METRIC_PUBLISH_ATTEMPT: &str = "inkwire_publish_attempt_total";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish target `{0}` not found")]
    TargetNotFound(Uuid),
    #[error("integration `{0}` referenced by the publish target no longer exists")]
    IntegrationNotFound(Uuid),
    #[error("publish target `{0}` was modified by a concurrent attempt")]
    Conflict(Uuid),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for PublishError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Conflict { id, .. } => PublishError::Conflict(id),
            other => PublishError::Repo(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    AlreadyPublished,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Disabled => "disabled",
            SkipReason::AlreadyPublished => "already_published",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Skipped(SkipReason),
    Published,
    Failed { kind: FailureKind, message: String },
}

impl AttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Skipped(_) => "skipped",
            AttemptOutcome::Published => "published",
            AttemptOutcome::Failed { .. } => "failed",
        }
    }
}

/// Target state after an attempt, plus what the attempt did.
#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub target: PublishTargetRecord,
    pub outcome: AttemptOutcome,
}

pub struct PublishService {
    targets: Arc<dyn PublishTargetsRepo>,
    integrations: Arc<dyn IntegrationsRepo>,
    store: Arc<dyn PublishAttemptStore>,
    registry: Arc<HandlerRegistry>,
    handler_timeout: Duration,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Share of a per-target lock. Dropping the last lease removes the table
/// entry, including when the attempt future is cancelled mid-flight.
struct TargetLease<'a> {
    locks: &'a DashMap<Uuid, Arc<Mutex<()>>>,
    target_id: Uuid,
    lock: Arc<Mutex<()>>,
}

impl<'a> TargetLease<'a> {
    fn acquire(locks: &'a DashMap<Uuid, Arc<Mutex<()>>>, target_id: Uuid) -> Self {
        let lock = locks
            .entry(target_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self {
            locks,
            target_id,
            lock,
        }
    }
}

impl Drop for TargetLease<'_> {
    fn drop(&mut self) {
        // The table and this lease account for two references.
        self.locks
            .remove_if(&self.target_id, |_, entry| Arc::strong_count(entry) <= 2);
    }
}

impl PublishService {
    pub fn new(
        targets: Arc<dyn PublishTargetsRepo>,
        integrations: Arc<dyn IntegrationsRepo>,
        store: Arc<dyn PublishAttemptStore>,
        registry: Arc<HandlerRegistry>,
        handler_timeout: Duration,
    ) -> Self {
        Self {
            targets,
            integrations,
            store,
            registry,
            handler_timeout,
            locks: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub async fn attempt_publish(
        &self,
        target_id: Uuid,
        content: Value,
    ) -> Result<AttemptReport, PublishError> {
        let result = {
            let lease = TargetLease::acquire(&self.locks, target_id);
            let _guard = lease.lock.lock().await;
            self.attempt_locked(target_id, content).await
        };

        if let Ok(report) = &result {
            counter!(METRIC_PUBLISH_ATTEMPT, "outcome" => report.outcome.label())
                .increment(1);
        }

        result
    }

    async fn attempt_locked(
        &self,
        target_id: Uuid,
        content: Value,
    ) -> Result<AttemptReport, PublishError> {
        let mut target = self
            .targets
            .find_by_id(target_id)
            .await?
            .ok_or(PublishError::TargetNotFound(target_id))?;

        if let Some(reason) = skip_reason(&target) {
            debug!(
                target = "application::publish::attempt_publish",
                target_id = %target_id,
                reason = reason.as_str(),
                "skipping publish attempt"
            );
            return Ok(AttemptReport {
                target,
                outcome: AttemptOutcome::Skipped(reason),
            });
        }

        let integration = self
            .integrations
            .find_by_id(target.integration_id)
            .await?
            .ok_or(PublishError::IntegrationNotFound(target.integration_id))?;

        let expected = target.revision();
        let delivery = match self.registry.resolve(&integration.definition_code).await {
            Ok(handler) => {
                self.invoke(handler.as_ref(), &integration, &target, &content)
                    .await
            }
            Err(ResolveError::Repo(err)) => return Err(err.into()),
            Err(err @ ResolveError::DefinitionNotFound { .. }) => {
                Err((FailureKind::DefinitionNotFound, err.to_string()))
            }
            Err(err @ ResolveError::HandlerResolution { .. }) => {
                Err((FailureKind::HandlerResolution, err.to_string()))
            }
        };

        let finished_at = OffsetDateTime::now_utc();
        let (log, outcome) = match delivery {
            Ok(response) => {
                target.mark_published(finished_at);
                let log = PublishLogRecord::success(target.id, content, response, finished_at);
                (log, AttemptOutcome::Published)
            }
            Err((kind, message)) => {
                let message = non_empty_message(kind, message);
                target.mark_failed(message.clone(), finished_at);
                let log =
                    PublishLogRecord::failure(target.id, content, kind, message.clone(), finished_at);
                (log, AttemptOutcome::Failed { kind, message })
            }
        };

        self.store.record_attempt(expected, &target, &log).await?;

        match &outcome {
            AttemptOutcome::Failed { kind, message } => warn!(
                target = "application::publish::attempt_publish",
                target_id = %target.id,
                integration_id = %integration.id,
                code = %integration.definition_code,
                error_kind = kind.as_str(),
                retry_count = target.retry_count,
                error = %message,
                "publish attempt failed"
            ),
            _ => info!(
                target = "application::publish::attempt_publish",
                target_id = %target.id,
                integration_id = %integration.id,
                code = %integration.definition_code,
                "publish attempt succeeded"
            ),
        }

        Ok(AttemptReport { target, outcome })
    }

    async fn invoke(
        &self,
        handler: &dyn PublishHandler,
        integration: &IntegrationRecord,
        target: &PublishTargetRecord,
        content: &Value,
    ) -> Result<Option<Value>, (FailureKind, String)> {
        match tokio::time::timeout(
            self.handler_timeout,
            handler.publish(integration, target, content),
        )
        .await
        {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err((FailureKind::HandlerPublish, err.to_string())),
            Err(_) => Err((
                FailureKind::HandlerTimeout,
                format!(
                    "handler did not finish within {} ms",
                    self.handler_timeout.as_millis()
                ),
            )),
        }
    }
}

fn skip_reason(target: &PublishTargetRecord) -> Option<SkipReason> {
    if !target.is_enabled {
        Some(SkipReason::Disabled)
    } else if target.status == PublishTargetStatus::Published {
        Some(SkipReason::AlreadyPublished)
    } else {
        None
    }
}

fn non_empty_message(kind: FailureKind, message: String) -> String {
    if message.trim().is_empty() {
        format!("{} without a message", kind.as_str())
    } else {
        message
    }
}
