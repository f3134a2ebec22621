//! Free-text event description parser.
//!
//! Two literal grammars, tried in order:
//!
//! | Grammar | Example |
//! |---------|---------|
//! | `YYYY-MM-DD HH:MM-HH:MM <title>` | `2024-08-15 10:00-11:00 会議` |
//! | `MM/DD HH:MM-HH:MM <title>` | `08/20 09:00-09:30 Standup` |
//!
//! The second form takes the year from the caller. Anything else is a
//! no-match, reported as `None` rather than an error.

use std::sync::LazyLock;

use calbot_core::types::EventDraft;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;

static FULL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})\s+(\d{1,2}):(\d{2})-(\d{1,2}):(\d{2})\s+(.+)")
        .expect("static regex")
});

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})\s+(\d{1,2}):(\d{2})-(\d{1,2}):(\d{2})\s+(.+)")
        .expect("static regex")
});

/// Parse `text` into a draft in `zone`. `reference_year` fills in the year
/// for the `MM/DD` form.
///
/// Returns `None` when no grammar matches, when a component is out of range
/// (month 13, `25:00`, February 30), or when a wall-clock time falls in a
/// DST gap. Ambiguous wall-clock times resolve to the earlier instant. The
/// end is built on the start's date and is not checked against the start.
pub fn parse(text: &str, reference_year: i32, zone: Tz) -> Option<EventDraft> {
    let text = text.trim();

    if let Some(caps) = FULL_DATE.captures(text) {
        let date = NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )?;
        return build(date, &caps[4], &caps[5], &caps[6], &caps[7], &caps[8], zone);
    }

    if let Some(caps) = MONTH_DAY.captures(text) {
        let date = NaiveDate::from_ymd_opt(
            reference_year,
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
        )?;
        return build(date, &caps[3], &caps[4], &caps[5], &caps[6], &caps[7], zone);
    }

    None
}

/// [`parse`] with the current year in `zone`.
pub fn parse_now(text: &str, zone: Tz) -> Option<EventDraft> {
    parse(text, current_year(Utc::now(), zone), zone)
}

pub fn current_year(now: DateTime<Utc>, zone: Tz) -> i32 {
    now.with_timezone(&zone).year()
}

fn build(
    date: NaiveDate,
    start_hour: &str,
    start_minute: &str,
    end_hour: &str,
    end_minute: &str,
    title: &str,
    zone: Tz,
) -> Option<EventDraft> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }

    let start = localize(date, time(start_hour, start_minute)?, zone)?;
    let end = localize(date, time(end_hour, end_minute)?, zone)?;

    Some(EventDraft {
        title: title.to_string(),
        start,
        end,
    })
}

fn time(hour: &str, minute: &str) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour.parse().ok()?, minute.parse().ok()?, 0)
}

fn localize(date: NaiveDate, time: NaiveTime, zone: Tz) -> Option<DateTime<Tz>> {
    zone.from_local_datetime(&date.and_time(time)).earliest()
}
