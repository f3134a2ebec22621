//! # CalBot Channels
//! Notification sinks: Discord, outbound webhook, and a log-only sink.

pub mod discord;
pub mod log;
pub mod text;
pub mod webhook;

pub use discord::DiscordChannel;
pub use log::LogSink;
pub use webhook::WebhookChannel;

use calbot_core::config::ChannelConfig;
use calbot_core::error::Result;
use calbot_core::traits::NotificationSink;
use chrono_tz::Tz;

/// Build every enabled sink, highest priority first, paired with its
/// priority.
pub fn create_sinks(config: &ChannelConfig, zone: Tz) -> Result<Vec<(u8, Box<dyn NotificationSink>)>> {
    let mut sinks: Vec<(u8, Box<dyn NotificationSink>)> = Vec::new();
    if let Some(discord) = config.discord.as_ref().filter(|d| d.enabled) {
        sinks.push((1, Box::new(DiscordChannel::new(discord, zone)?)));
    }
    if let Some(webhook) = config.webhook.as_ref().filter(|w| w.enabled) {
        sinks.push((2, Box::new(WebhookChannel::new(webhook, zone))));
    }
    Ok(sinks)
}
