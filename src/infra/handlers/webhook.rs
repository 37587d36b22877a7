use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{Value, json};

use crate::application::publish::{HandlerError, PublishHandler};
use crate::domain::entities::{IntegrationRecord, PublishTargetRecord};

pub const WEBHOOK_LOCATOR: &str = "inkwire::handlers::webhook";

const MAX_ERROR_BODY_CHARS: usize = 512;

/// POSTs `{target, content}` as JSON to the integration's `url` credential.
#[derive(Debug, Clone)]
pub struct WebhookHandler {
    client: Client,
}

impl WebhookHandler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn endpoint(integration: &IntegrationRecord) -> Result<Url, HandlerError> {
        let raw = integration
            .credentials
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerError::configuration("credentials.url is missing"))?;
        Url::parse(raw)
            .map_err(|err| HandlerError::configuration(format!("credentials.url: {err}")))
    }
}

#[async_trait]
impl PublishHandler for WebhookHandler {
    async fn publish(
        &self,
        integration: &IntegrationRecord,
        target: &PublishTargetRecord,
        content: &Value,
    ) -> Result<Option<Value>, HandlerError> {
        let url = Self::endpoint(integration)?;
        let body = json!({
            "target": {
                "id": target.id,
                "integration_id": target.integration_id,
                "content_kind": target.content.kind(),
                "object_id": target.content.object_id(),
                "publish_settings": target.publish_settings,
            },
            "content": content,
        });

        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| HandlerError::delivery(format!("webhook request failed: {err}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(HandlerError::Rejected {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        Ok(Some(json!({
            "sent": content,
            "status": status.as_u16(),
        })))
    }
}
