//! Discord Bot channel: REST API only.
//!
//! Posts reminders to one text channel. No gateway connection: the bot
//! never reads messages, it only writes them.

use async_trait::async_trait;
use calbot_core::config::DiscordConfig;
use calbot_core::error::{CalBotError, Result};
use calbot_core::traits::NotificationSink;
use calbot_core::types::Notification;
use chrono_tz::Tz;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::text;

const DISCORD_API: &str = "https://discord.com/api/v10";

/// Discord caps message content at 2000 characters.
const MESSAGE_LIMIT: usize = 2000;

/// Discord Bot channel.
pub struct DiscordChannel {
    channel_id: String,
    api_base: String,
    zone: Tz,
    client: reqwest::Client,
}

impl DiscordChannel {
    pub fn new(config: &DiscordConfig, zone: Tz) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bot {}", config.bot_token))
            .map_err(|e| CalBotError::config(format!("Invalid Discord token: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(USER_AGENT, HeaderValue::from_static(concat!("CalBot/", env!("CARGO_PKG_VERSION"))));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| CalBotError::Http(format!("HTTP client: {e}")))?;

        Ok(Self {
            channel_id: config.channel_id.clone(),
            api_base: DISCORD_API.to_string(),
            zone,
            client,
        })
    }

    /// Point at another API root (tests, proxies).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Send a message to a channel.
    pub async fn send_message(&self, channel_id: &str, content: &str) -> Result<()> {
        let url = format!("{}/channels/{channel_id}/messages", self.api_base);
        let body = serde_json::json!({ "content": text::truncate(content, MESSAGE_LIMIT - 3) });

        let response = self.client.post(&url).json(&body).send().await
            .map_err(|e| CalBotError::dispatch(format!("Discord send failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(CalBotError::ChannelNotFound(format!("Discord channel {channel_id}: {text}")));
        }
        Err(CalBotError::dispatch(format!("Discord {status}: {text}")))
    }

    /// Get current bot info.
    pub async fn get_me(&self) -> Result<DiscordUser> {
        let response = self.client
            .get(format!("{}/users/@me", self.api_base))
            .send().await
            .map_err(|e| CalBotError::dispatch(format!("getMe failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CalBotError::dispatch(format!("Discord {status}: {text}")));
        }
        response.json().await
            .map_err(|e| CalBotError::dispatch(format!("Invalid response: {e}")))
    }
}

#[async_trait]
impl NotificationSink for DiscordChannel {
    fn name(&self) -> &str { "discord" }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let content = text::render(notification, &self.zone);
        self.send_message(&self.channel_id, &content).await
    }
}

// --- Discord API Types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    pub discriminator: Option<String>,
    pub bot: Option<bool>,
}
