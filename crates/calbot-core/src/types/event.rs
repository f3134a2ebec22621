//! Calendar event types: drafts, backend events and query windows.

use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CalBotError, Result};

/// A not-yet-persisted event produced from free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl EventDraft {
    pub fn zone(&self) -> Tz {
        self.start.timezone()
    }
}

/// When an event happens. Backends report either instants or bare dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventTiming {
    Timed {
        start: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        end: Option<DateTime<Utc>>,
    },
    AllDay {
        start: NaiveDate,
        #[serde(skip_serializing_if = "Option::is_none")]
        end: Option<NaiveDate>,
    },
}

impl EventTiming {
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay { .. })
    }

    /// Start instant. All-day events start at local midnight in `zone`.
    pub fn starts_at(&self, zone: &Tz) -> DateTime<Utc> {
        match self {
            Self::Timed { start, .. } => *start,
            Self::AllDay { start, .. } => local_midnight(*start, zone),
        }
    }
}

/// A calendar entry as returned by an event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Stable and unique within the backend.
    pub id: String,
    pub title: String,
    pub timing: EventTiming,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Event {
    pub fn timed(id: impl Into<String>, title: impl Into<String>, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            timing: EventTiming::Timed { start, end },
            location: None,
            description: None,
        }
    }

    pub fn all_day(id: impl Into<String>, title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            timing: EventTiming::AllDay { start: date, end: date.succ_opt() },
            location: None,
            description: None,
        }
    }

    pub fn starts_at(&self, zone: &Tz) -> DateTime<Utc> {
        self.timing.starts_at(zone)
    }

    /// Case-insensitive exact title comparison used by delete-by-title.
    pub fn title_matches(&self, title: &str) -> bool {
        self.title.to_lowercase() == title.to_lowercase()
    }
}

/// Closed time interval `[from, to]` bounding a backend query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl Window {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(CalBotError::InvalidWindow(format!(
                "from {} is after to {}",
                from.to_rfc3339(),
                to.to_rfc3339()
            )));
        }
        Ok(Self { from, to })
    }

    /// `[start, start + length]`; negative lengths collapse to an empty window.
    pub fn starting_at(start: DateTime<Utc>, length: Duration) -> Result<Self> {
        let to = start
            .checked_add_signed(length.max(Duration::zero()))
            .ok_or_else(|| overflow("window end", start))?;
        Ok(Self { from: start, to })
    }

    /// `[start, start + days]`.
    pub fn days_ahead(start: DateTime<Utc>, days: i64) -> Result<Self> {
        let length = Duration::try_days(days)
            .ok_or_else(|| CalBotError::InvalidWindow(format!("{days} days is out of range")))?;
        Self::starting_at(start, length)
    }

    /// `[center - tolerance, center + tolerance]`.
    pub fn around(center: DateTime<Utc>, tolerance: Duration) -> Result<Self> {
        let tolerance = tolerance.abs();
        let from = center.checked_sub_signed(tolerance).ok_or_else(|| overflow("window start", center))?;
        let to = center.checked_add_signed(tolerance).ok_or_else(|| overflow("window end", center))?;
        Ok(Self { from, to })
    }

    /// Reminder window for events starting `minutes_ahead` from `now`,
    /// with `tolerance_minutes` of slack on each side.
    pub fn for_reminder(now: DateTime<Utc>, minutes_ahead: i64, tolerance_minutes: i64) -> Result<Self> {
        let ahead = minutes(minutes_ahead)?;
        let center = now.checked_add_signed(ahead).ok_or_else(|| overflow("reminder target", now))?;
        Self::around(center, minutes(tolerance_minutes)?)
    }

    /// Local midnight today in `zone` through local midnight `days` days
    /// later. DST days are 23 or 25 hours long.
    pub fn days_from_local_midnight(now: DateTime<Utc>, zone: &Tz, days: i64) -> Result<Self> {
        let today = now.with_timezone(zone).date_naive();
        let last = u64::try_from(days)
            .ok()
            .and_then(|d| today.checked_add_days(Days::new(d)))
            .ok_or_else(|| CalBotError::InvalidWindow(format!("{days} days from {today} is out of range")))?;
        Self::new(local_midnight(today, zone), local_midnight(last, zone))
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant <= self.to
    }

    /// Move the lower bound earlier, keeping `from <= to`.
    pub fn extend_back_to(self, from: DateTime<Utc>) -> Self {
        Self { from: from.min(self.from), to: self.to }
    }
}

fn minutes(count: i64) -> Result<Duration> {
    Duration::try_minutes(count)
        .ok_or_else(|| CalBotError::InvalidWindow(format!("{count} minutes is out of range")))
}

fn overflow(what: &str, base: DateTime<Utc>) -> CalBotError {
    CalBotError::InvalidWindow(format!("{what} overflows from {}", base.to_rfc3339()))
}

/// First instant of `date` in `zone`. Days that begin inside a DST gap
/// start at the first valid local time after midnight.
pub fn local_midnight(date: NaiveDate, zone: &Tz) -> DateTime<Utc> {
    let mut naive = date.and_time(chrono::NaiveTime::MIN);
    for _ in 0..4 {
        if let Some(dt) = zone.from_local_datetime(&naive).earliest() {
            return dt.with_timezone(&Utc);
        }
        naive += Duration::minutes(30);
    }
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}
