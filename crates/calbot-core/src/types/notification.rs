//! Notification payloads handed to sinks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::event::Event;

/// What a notification sink is asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Notification {
    /// An event is about to start.
    Reminder { event: Event, minutes_ahead: i64 },
    /// Everything on the calendar for one day.
    Digest { date: NaiveDate, events: Vec<Event> },
}

impl Notification {
    pub fn reminder(event: Event, minutes_ahead: i64) -> Self {
        Self::Reminder { event, minutes_ahead }
    }

    pub fn digest(date: NaiveDate, events: Vec<Event>) -> Self {
        Self::Digest { date, events }
    }

    /// Short label for logs.
    pub fn label(&self) -> String {
        match self {
            Self::Reminder { event, .. } => format!("reminder '{}' ({})", event.title, event.id),
            Self::Digest { date, events } => format!("digest {date} ({} events)", events.len()),
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
