//! In-process event source: used for dry runs and tests.

use async_trait::async_trait;
use calbot_core::error::{CalBotError, Result};
use calbot_core::traits::EventSource;
use calbot_core::types::{Event, EventDraft, Window};
use chrono::Utc;
use chrono_tz::Tz;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Most recent `list_events` windows kept for inspection.
pub const QUERY_LOG_LIMIT: usize = 256;

pub struct InMemorySource {
    zone: Tz,
    cap: usize,
    events: Mutex<Vec<Event>>,
    queries: Mutex<VecDeque<Window>>,
    failures: Mutex<u32>,
}

impl InMemorySource {
    pub fn new(zone: Tz) -> Self {
        Self {
            zone,
            cap: 50,
            events: Mutex::new(Vec::new()),
            queries: Mutex::new(VecDeque::new()),
            failures: Mutex::new(0),
        }
    }

    pub fn with_events(zone: Tz, events: Vec<Event>) -> Self {
        let source = Self::new(zone);
        if let Ok(mut guard) = source.events.lock() {
            *guard = events;
        }
        source
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    pub fn insert(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// The last [`QUERY_LOG_LIMIT`] windows passed to `list_events`,
    /// oldest first.
    pub fn queries(&self) -> Vec<Window> {
        self.queries.lock().map(|q| q.iter().copied().collect()).unwrap_or_default()
    }

    /// Make the next `count` calls fail with a source error.
    pub fn fail_next(&self, count: u32) {
        if let Ok(mut failures) = self.failures.lock() {
            *failures = count;
        }
    }

    fn check_failure(&self) -> Result<()> {
        let mut failures = self.failures.lock()
            .map_err(|e| CalBotError::backend(e.to_string()))?;
        if *failures > 0 {
            *failures -= 1;
            return Err(CalBotError::backend("injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl EventSource for InMemorySource {
    fn name(&self) -> &str { "memory" }

    /// Events whose start lies in `[from, to]`.
    async fn list_events(&self, window: &Window) -> Result<Vec<Event>> {
        if let Ok(mut queries) = self.queries.lock() {
            if queries.len() == QUERY_LOG_LIMIT {
                queries.pop_front();
            }
            queries.push_back(*window);
        }
        self.check_failure()?;

        let events = self.events.lock()
            .map_err(|e| CalBotError::backend(e.to_string()))?;
        let mut found: Vec<Event> = events
            .iter()
            .filter(|e| window.contains(e.starts_at(&self.zone)))
            .cloned()
            .collect();
        found.sort_by_key(|e| e.starts_at(&self.zone));
        found.truncate(self.cap);
        Ok(found)
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<Event> {
        self.check_failure()?;
        let event = Event::timed(
            uuid::Uuid::new_v4().to_string(),
            draft.title.clone(),
            draft.start.with_timezone(&Utc),
            Some(draft.end.with_timezone(&Utc)),
        );
        self.insert(event.clone());
        Ok(event)
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        self.check_failure()?;
        let mut events = self.events.lock()
            .map_err(|e| CalBotError::backend(e.to_string()))?;
        let before = events.len();
        events.retain(|e| e.id != id);
        if events.len() == before {
            return Err(CalBotError::SourceNotFound(format!("event {id}")));
        }
        Ok(())
    }
}
