//! Built-in publish handlers and the locator table that exposes them.

mod webhook;

pub use webhook::{WEBHOOK_LOCATOR, WebhookHandler};

use reqwest::Client;

use crate::application::publish::{LocatorTable, handler_factory};
use crate::config::PublishSettings;

use super::error::InfraError;

/// Locators that seeded or admin-created definitions may reference.
pub fn builtin_locators(settings: &PublishSettings) -> Result<LocatorTable, InfraError> {
    let client = Client::builder()
        .user_agent(settings.webhook_user_agent.as_str())
        .build()
        .map_err(|err| InfraError::http(format!("failed to build webhook client: {err}")))?;

    Ok(LocatorTable::new().with(
        WEBHOOK_LOCATOR,
        handler_factory(move || WebhookHandler::new(client.clone())),
    ))
}
