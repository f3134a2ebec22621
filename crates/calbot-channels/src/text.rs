//! Plain-text rendering of notifications for chat channels.

use calbot_core::types::{Event, EventTiming, Notification};
use chrono_tz::Tz;

/// Longest description shown in a reminder, in characters.
pub const DESCRIPTION_LIMIT: usize = 100;

pub fn render(notification: &Notification, zone: &Tz) -> String {
    match notification {
        Notification::Reminder { event, minutes_ahead } => render_reminder(event, *minutes_ahead, zone),
        Notification::Digest { date, events } => {
            let mut lines = vec![format!("Schedule for {}", date.format("%m/%d (%a)"))];
            if events.is_empty() {
                lines.push("No events today.".to_string());
            }
            for event in events {
                let time = match &event.timing {
                    EventTiming::Timed { start, .. } => start.with_timezone(zone).format("%H:%M").to_string(),
                    EventTiming::AllDay { .. } => "all day".to_string(),
                };
                lines.push(format!("- {time} {}", title(event)));
            }
            lines.join("\n")
        }
    }
}

fn render_reminder(event: &Event, minutes_ahead: i64, zone: &Tz) -> String {
    let when = match &event.timing {
        EventTiming::Timed { start, .. } => start.with_timezone(zone).format("%m/%d %H:%M").to_string(),
        EventTiming::AllDay { start, .. } => format!("{} all day", start.format("%m/%d")),
    };

    let mut lines = vec![
        format!("Reminder: **{}**", title(event)),
        when,
        format!("Starts in about {minutes_ahead} min"),
    ];
    if let Some(location) = &event.location {
        lines.push(format!("Location: {location}"));
    }
    if let Some(description) = &event.description {
        lines.push(format!("Details: {}", truncate(description, DESCRIPTION_LIMIT)));
    }
    lines.join("\n")
}

fn title(event: &Event) -> &str {
    if event.title.trim().is_empty() { "(no title)" } else { &event.title }
}

/// Cut at `limit` characters, marking the cut with "...".
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
