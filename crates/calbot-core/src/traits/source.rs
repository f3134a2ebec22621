//! Event source trait: the calendar backend boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Event, EventDraft, Window};

/// Slack on each side of the reminder target.
pub const REMINDER_TOLERANCE_MINUTES: i64 = 1;

/// A calendar backend. Every call may be slow or network-bound.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Source name (e.g., "google", "memory").
    fn name(&self) -> &str;

    /// Events intersecting `window`, start-ascending, recurring events
    /// expanded to single occurrences, capped at the source's result limit.
    /// An empty window yields an empty list, never an error.
    async fn list_events(&self, window: &Window) -> Result<Vec<Event>>;

    /// Persist a draft and return the created event.
    async fn create_event(&self, draft: &EventDraft) -> Result<Event>;

    /// Delete one event by id.
    async fn delete_event(&self, id: &str) -> Result<()>;

    /// Events starting `minutes_ahead` from `now`, give or take
    /// `tolerance_minutes`.
    async fn list_for_reminder_at(
        &self,
        now: DateTime<Utc>,
        minutes_ahead: i64,
        tolerance_minutes: i64,
    ) -> Result<Vec<Event>> {
        let window = Window::for_reminder(now, minutes_ahead, tolerance_minutes)?;
        self.list_events(&window).await
    }

    /// Events starting `minutes_ahead` from the wall clock, ±1 minute.
    async fn list_for_reminder(&self, minutes_ahead: i64) -> Result<Vec<Event>> {
        self.list_for_reminder_at(Utc::now(), minutes_ahead, REMINDER_TOLERANCE_MINUTES).await
    }

    /// Events from `now` to `now + days`.
    async fn list_upcoming(&self, now: DateTime<Utc>, days: i64) -> Result<Vec<Event>> {
        self.list_events(&Window::days_ahead(now, days)?).await
    }

    /// Delete the first event in `window` whose title matches `title`
    /// case-insensitively. Returns `false` when nothing matched.
    async fn delete_by_title_within(&self, title: &str, window: &Window) -> Result<bool> {
        let events = self.list_events(window).await?;
        let Some(event) = events.iter().find(|e| e.title_matches(title)) else {
            return Ok(false);
        };
        self.delete_event(&event.id).await?;
        tracing::info!("Deleted event '{}' ({})", event.title, event.id);
        Ok(true)
    }

    /// Delete by title over the next `days` days (`horizons.delete_search_days`).
    async fn delete_by_title(&self, title: &str, days: i64) -> Result<bool> {
        let window = Window::days_ahead(Utc::now(), days)?;
        self.delete_by_title_within(title, &window).await
    }
}
