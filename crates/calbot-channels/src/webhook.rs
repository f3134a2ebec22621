//! Webhook channel: POST notifications as JSON.
//!
//! Useful for integrating with external systems (Zapier, n8n, custom APIs).

use async_trait::async_trait;
use calbot_core::config::WebhookConfig;
use calbot_core::error::{CalBotError, Result};
use calbot_core::traits::NotificationSink;
use calbot_core::types::Notification;
use chrono_tz::Tz;
use serde::Serialize;

use crate::text;

/// Webhook channel.
pub struct WebhookChannel {
    url: String,
    zone: Tz,
    client: reqwest::Client,
}

/// Body of each outbound POST.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    /// Rendered text, for endpoints that just relay it.
    content: String,
    notification: &'a Notification,
}

impl WebhookChannel {
    pub fn new(config: &WebhookConfig, zone: Tz) -> Self {
        Self {
            url: config.outbound_url.clone(),
            zone,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookChannel {
    fn name(&self) -> &str { "webhook" }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let payload = WebhookPayload {
            content: text::render(notification, &self.zone),
            notification,
        };

        let response = self.client.post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CalBotError::dispatch(format!("Webhook send failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CalBotError::dispatch(format!("Webhook {status}: {text}")));
        }
        Ok(())
    }
}
