//! Google Calendar v3 REST adapter.
//!
//! Queries are keyed by `[timeMin, timeMax]` in UTC, with single-occurrence
//! expansion and start-time ordering. The bearer token comes from
//! configuration; acquiring or refreshing it happens elsewhere.

use async_trait::async_trait;
use calbot_core::config::CalendarConfig;
use calbot_core::error::{CalBotError, Result};
use calbot_core::traits::EventSource;
use calbot_core::types::{Event, EventDraft, EventTiming, Window};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub struct GoogleCalendar {
    calendar_id: String,
    api_base: String,
    access_token: String,
    list_cap: u32,
    check_cap: u32,
    client: reqwest::Client,
}

impl GoogleCalendar {
    pub fn new(config: &CalendarConfig) -> Result<Self> {
        let access_token = config.access_token.clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CalBotError::AuthFailed(
                "No access token configured (calendar.access_token or GOOGLE_ACCESS_TOKEN)".into()
            ))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.call_timeout_secs))
            .user_agent(concat!("CalBot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CalBotError::Http(format!("HTTP client: {e}")))?;

        Ok(Self {
            calendar_id: config.calendar_id.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token,
            list_cap: config.list_cap,
            check_cap: config.check_cap,
            client,
        })
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn calendar_url(&self) -> String {
        format!("{}/calendars/{}", self.api_base, urlencoding::encode(&self.calendar_id))
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.calendar_url())
    }

    async fn fetch_events(&self, window: &Window, cap: u32) -> Result<Vec<Event>> {
        let time_min = rfc3339(window.from());
        let time_max = rfc3339(window.to());
        tracing::debug!("Listing events {time_min} .. {time_max} (max {cap})");

        let response = self.client
            .get(self.events_url())
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", cap.to_string().as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let response = self.check_status(response, "list events").await?;
        let body: EventsListResponse = response.json().await
            .map_err(|e| CalBotError::backend(format!("Invalid events response: {e}")))?;

        Ok(body.items
            .into_iter()
            .filter(|item| item.status.as_deref() != Some("cancelled"))
            .filter_map(|item| {
                let id = item.id.clone();
                let event = item.into_event();
                if event.is_none() {
                    tracing::warn!("Skipping event {id}: unreadable start time");
                }
                event
            })
            .collect())
    }

    async fn check_status(&self, response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &self.calendar_id, action, &body))
    }

    /// Verify the calendar is reachable and shared with us: read its
    /// metadata and up to `check_cap` events in the next day.
    pub async fn check_connection(&self, now: DateTime<Utc>) -> Result<ConnectionReport> {
        let response = self.client
            .get(self.calendar_url())
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport_error)?;

        let response = match self.check_status(response, "read calendar").await {
            Ok(r) => r,
            Err(e) => {
                match &e {
                    CalBotError::SourceNotFound(_) => tracing::error!(
                        "Calendar '{}' not found: check the calendar id and that it is shared with this account",
                        self.calendar_id
                    ),
                    CalBotError::SourceForbidden(_) => tracing::error!(
                        "No access to calendar '{}': share it with permission to make changes to events",
                        self.calendar_id
                    ),
                    _ => tracing::error!("Calendar connection failed: {e}"),
                }
                return Err(e);
            }
        };

        let meta: CalendarMeta = response.json().await
            .map_err(|e| CalBotError::backend(format!("Invalid calendar response: {e}")))?;

        let upcoming = self
            .fetch_events(&Window::days_ahead(now, 1)?, self.check_cap)
            .await?;

        tracing::info!(
            "Calendar '{}' ({}) reachable, {} events in the next 24h",
            meta.summary.as_deref().unwrap_or("N/A"),
            self.calendar_id,
            upcoming.len()
        );

        Ok(ConnectionReport {
            calendar_id: self.calendar_id.clone(),
            summary: meta.summary,
            time_zone: meta.time_zone,
            upcoming,
        })
    }
}

#[async_trait]
impl EventSource for GoogleCalendar {
    fn name(&self) -> &str { "google" }

    async fn list_events(&self, window: &Window) -> Result<Vec<Event>> {
        self.fetch_events(window, self.list_cap).await
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<Event> {
        let zone = draft.zone().name().to_string();
        let body = EventWriteRequest {
            summary: draft.title.clone(),
            start: EventDateTime {
                date_time: Some(draft.start.to_rfc3339()),
                date: None,
                time_zone: Some(zone.clone()),
            },
            end: EventDateTime {
                date_time: Some(draft.end.to_rfc3339()),
                date: None,
                time_zone: Some(zone),
            },
        };

        let response = self.client
            .post(self.events_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let response = self.check_status(response, "create event").await?;
        let created: RemoteEvent = response.json().await
            .map_err(|e| CalBotError::backend(format!("Invalid create response: {e}")))?;

        let id = created.id.clone();
        let event = created.into_event()
            .ok_or_else(|| CalBotError::backend(format!("Created event {id} has no start time")))?;
        tracing::info!("Created event '{}' ({})", event.title, event.id);
        Ok(event)
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        let url = format!("{}/{}", self.events_url(), urlencoding::encode(id));
        let response = self.client
            .delete(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport_error)?;
        self.check_status(response, "delete event").await?;
        Ok(())
    }
}

/// Result of [`GoogleCalendar::check_connection`].
#[derive(Debug, Clone)]
pub struct ConnectionReport {
    pub calendar_id: String,
    pub summary: Option<String>,
    pub time_zone: Option<String>,
    pub upcoming: Vec<Event>,
}

fn rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn transport_error(e: reqwest::Error) -> CalBotError {
    if e.is_timeout() {
        CalBotError::Timeout(format!("Calendar request timed out: {e}"))
    } else {
        CalBotError::Http(format!("Calendar request failed: {e}"))
    }
}

/// Map a non-success status so operators can tell a missing or unshared
/// calendar from a transient fault.
fn status_error(status: StatusCode, calendar_id: &str, action: &str, body: &str) -> CalBotError {
    let detail = format!("{action} on '{calendar_id}' returned {status}: {body}");
    match status {
        StatusCode::NOT_FOUND => CalBotError::SourceNotFound(detail),
        StatusCode::FORBIDDEN => CalBotError::SourceForbidden(detail),
        StatusCode::UNAUTHORIZED => CalBotError::AuthFailed(detail),
        StatusCode::TOO_MANY_REQUESTS => CalBotError::RateLimited(detail),
        _ => CalBotError::Source(detail),
    }
}

// --- Google Calendar API Types ---

#[derive(Debug, Deserialize)]
struct EventsListResponse {
    #[serde(default)]
    items: Vec<RemoteEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarMeta {
    summary: Option<String>,
    time_zone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RemoteEvent {
    id: String,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<EventDateTime>,
    end: Option<EventDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Debug, Serialize)]
struct EventWriteRequest {
    summary: String,
    start: EventDateTime,
    end: EventDateTime,
}

impl EventDateTime {
    fn instant(&self) -> Option<DateTime<Utc>> {
        let raw = self.date_time.as_deref()?;
        DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
    }

    fn day(&self) -> Option<NaiveDate> {
        let raw = self.date.as_deref()?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }
}

impl RemoteEvent {
    /// `dateTime` makes a timed event, a bare `date` an all-day one.
    fn into_event(self) -> Option<Event> {
        let start = self.start.as_ref()?;
        let timing = if let Some(start) = start.instant() {
            EventTiming::Timed {
                start,
                end: self.end.as_ref().and_then(EventDateTime::instant),
            }
        } else {
            EventTiming::AllDay {
                start: start.day()?,
                end: self.end.as_ref().and_then(EventDateTime::day),
            }
        };

        Some(Event {
            id: self.id,
            title: self.summary.unwrap_or_default(),
            timing,
            location: self.location.filter(|l| !l.is_empty()),
            description: self.description.filter(|d| !d.is_empty()),
        })
    }
}
