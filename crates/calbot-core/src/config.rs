//! CalBot configuration, loaded from `~/.calbot/config.toml`.
//!
//! Every field has a default so a missing file (or a partial one) still
//! produces a usable config. Environment variables override file values
//! after loading.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CalBotError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalBotConfig {
    /// IANA zone used to interpret drafts and render times.
    pub timezone: String,
    pub calendar: CalendarConfig,
    pub reminder: ReminderConfig,
    pub dedup: DedupConfig,
    pub horizons: HorizonConfig,
    pub channel: ChannelConfig,
}

impl Default for CalBotConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Tokyo".into(),
            calendar: CalendarConfig::default(),
            reminder: ReminderConfig::default(),
            dedup: DedupConfig::default(),
            horizons: HorizonConfig::default(),
            channel: ChannelConfig::default(),
        }
    }
}

/// Google Calendar backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub calendar_id: String,
    pub api_base: String,
    /// OAuth bearer token. Obtaining it is outside CalBot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub list_cap: u32,
    pub check_cap: u32,
    pub call_timeout_secs: u64,
    /// Link appended to replies, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".into(),
            api_base: "https://www.googleapis.com/calendar/v3".into(),
            access_token: None,
            list_cap: 50,
            check_cap: 10,
            call_timeout_secs: 30,
            web_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub lookahead_minutes: i64,
    pub tolerance_minutes: i64,
    pub tick_secs: u64,
    pub max_backoff_secs: u64,
    /// Widen the query window to cover ticks that ran late.
    pub catch_up: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            lookahead_minutes: 10,
            tolerance_minutes: 1,
            tick_secs: 60,
            max_backoff_secs: 900,
            catch_up: true,
        }
    }
}

/// How the notified-event store sheds entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactionPolicy {
    /// Drop entries once their event has started (plus a margin), then the
    /// oldest ones if the store is still over the ceiling.
    Expiry,
    /// Clear the whole store once it grows past the ceiling.
    ClearAll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub ceiling: usize,
    pub policy: CompactionPolicy,
    pub expiry_margin_secs: i64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ceiling: 100,
            policy: CompactionPolicy::Expiry,
            expiry_margin_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonConfig {
    pub digest_days: i64,
    pub upcoming_days: i64,
    pub delete_search_days: i64,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            digest_days: 1,
            upcoming_days: 7,
            delete_search_days: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookConfig>,
}

/// Discord channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Channel reminders are posted to.
    pub channel_id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Webhook channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub outbound_url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool { true }

/// Upper bound for `reminder.lookahead_minutes` (one day).
pub const MAX_LOOKAHEAD_MINUTES: i64 = 24 * 60;

/// Upper bound for every `horizons.*_days` value, and for `calbot list <days>`.
pub const MAX_HORIZON_DAYS: i64 = 366;

impl CalBotConfig {
    /// `~/.calbot`
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".calbot")
    }

    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Load from the default path, falling back to defaults, then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::read(&path)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CalBotError::ConfigNotFound(path.display().to_string()));
        }
        let mut config = Self::read(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CalBotError::config(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Write to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| CalBotError::config(format!("Serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override file values from the environment. `lookup` is injectable
    /// so tests need not touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tz) = lookup("TIMEZONE") {
            self.timezone = tz;
        }
        if let Some(id) = lookup("GOOGLE_CALENDAR_ID") {
            self.calendar.calendar_id = id;
        }
        if let Some(token) = lookup("GOOGLE_ACCESS_TOKEN") {
            self.calendar.access_token = Some(token);
        }
        if let Some(url) = lookup("GOOGLE_CALENDAR_WEB_URL") {
            self.calendar.web_url = Some(url);
        }

        let token = lookup("DISCORD_TOKEN");
        let channel_id = lookup("REMINDER_CHANNEL_ID");
        if let Some(discord) = self.channel.discord.as_mut() {
            if let Some(token) = token {
                discord.bot_token = token;
            }
            if let Some(id) = channel_id {
                discord.channel_id = id;
            }
        } else if let (Some(bot_token), Some(channel_id)) = (token, channel_id) {
            self.channel.discord = Some(DiscordConfig { bot_token, channel_id, enabled: true });
        }

        if let Some(url) = lookup("REMINDER_WEBHOOK_URL") {
            self.channel.webhook = Some(WebhookConfig { outbound_url: url, enabled: true });
        }
    }

    /// Parsed target zone.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| CalBotError::config(format!("Unknown timezone '{}': {e}", self.timezone)))
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        if self.calendar.call_timeout_secs == 0 {
            return Err(CalBotError::config("calendar.call_timeout_secs must be positive"));
        }
        let r = &self.reminder;
        if r.tick_secs == 0 {
            return Err(CalBotError::config("reminder.tick_secs must be positive"));
        }
        if r.lookahead_minutes <= 0 || r.lookahead_minutes > MAX_LOOKAHEAD_MINUTES {
            return Err(CalBotError::config(format!(
                "reminder.lookahead_minutes must be between 1 and {MAX_LOOKAHEAD_MINUTES}"
            )));
        }
        if r.tolerance_minutes <= 0 || r.tolerance_minutes >= r.lookahead_minutes {
            return Err(CalBotError::config(
                "reminder.tolerance_minutes must be positive and below lookahead_minutes",
            ));
        }
        if self.dedup.ceiling == 0 {
            return Err(CalBotError::config("dedup.ceiling must be positive"));
        }
        let h = &self.horizons;
        for (key, days) in [
            ("digest_days", h.digest_days),
            ("upcoming_days", h.upcoming_days),
            ("delete_search_days", h.delete_search_days),
        ] {
            if !(1..=MAX_HORIZON_DAYS).contains(&days) {
                return Err(CalBotError::config(format!(
                    "horizons.{key} must be between 1 and {MAX_HORIZON_DAYS}"
                )));
            }
        }
        Ok(())
    }
}
