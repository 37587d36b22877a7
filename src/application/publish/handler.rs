use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::entities::{IntegrationRecord, PublishTargetRecord};

/// Failure raised by a handler while delivering content.
///
/// The publish service records every variant the same way; the split only
/// keeps log messages precise.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Delivery(String),
    #[error("integration is misconfigured: {0}")]
    Configuration(String),
    #[error("provider responded with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl HandlerError {
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Delivers content for one integration type.
#[async_trait]
pub trait PublishHandler: Send + Sync {
    /// Returns the provider's response payload, if it produced one.
    async fn publish(
        &self,
        integration: &IntegrationRecord,
        target: &PublishTargetRecord,
        content: &Value,
    ) -> Result<Option<Value>, HandlerError>;
}

/// Produces a fresh handler instance per attempt.
pub type HandlerFactory = Arc<dyn Fn() -> Box<dyn PublishHandler> + Send + Sync>;

pub fn handler_factory<F, H>(make: F) -> HandlerFactory
where
    F: Fn() -> H + Send + Sync + 'static,
    H: PublishHandler + 'static,
{
    Arc::new(move || Box::new(make()) as Box<dyn PublishHandler>)
}
