//! Daily digest: everything on the calendar for the local day.

use std::sync::Arc;

use calbot_core::error::Result;
use calbot_core::traits::{Clock, EventSource, NotificationSink};
use calbot_core::types::{Event, Notification, Window};
use chrono_tz::Tz;

pub struct DailyDigestJob {
    source: Arc<dyn EventSource>,
    clock: Arc<dyn Clock>,
    zone: Tz,
    days: i64,
}

impl DailyDigestJob {
    pub fn new(source: Arc<dyn EventSource>, clock: Arc<dyn Clock>, zone: Tz) -> Self {
        Self { source, clock, zone, days: 1 }
    }

    pub fn with_days(mut self, days: i64) -> Self {
        self.days = days.max(1);
        self
    }

    /// From local midnight today, `days` days long.
    pub fn window(&self) -> Result<Window> {
        Window::days_from_local_midnight(self.clock.now(), &self.zone, self.days)
    }

    /// Today's events, start-ascending. Not deduplicated.
    pub async fn run(&self) -> Result<Vec<Event>> {
        let window = self.window()?;
        tracing::debug!(
            "Digest window: {} .. {}",
            window.from().to_rfc3339(),
            window.to().to_rfc3339()
        );
        self.source.list_events(&window).await
    }

    /// Deliver today's digest, even when the day is empty. Returns the
    /// number of events included.
    pub async fn send(&self, sink: &dyn NotificationSink) -> Result<usize> {
        let events = self.run().await?;
        let count = events.len();
        let date = self.clock.now().with_timezone(&self.zone).date_naive();
        let notification = Notification::digest(date, events);
        sink.deliver(&notification).await?;
        tracing::info!("Sent {notification} via {}", sink.name());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use calbot_calendar::InMemorySource;
    use calbot_core::traits::ManualClock;
    use chrono::{NaiveDate, TimeZone, Utc};
    use chrono_tz::Asia::Tokyo;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        fn name(&self) -> &str { "recording" }

        async fn deliver(&self, notification: &Notification) -> Result<()> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_digest_covers_local_day() {
        // 08:00 in Tokyo on 2024-08-15.
        let now = Utc.with_ymd_and_hms(2024, 8, 14, 23, 0, 0).unwrap();
        let events = vec![
            Event::timed("morning", "Standup", Utc.with_ymd_and_hms(2024, 8, 15, 0, 0, 0).unwrap(), None),
            Event::timed("early", "Gym", Utc.with_ymd_and_hms(2024, 8, 14, 21, 0, 0).unwrap(), None),
            Event::timed("yesterday", "x", Utc.with_ymd_and_hms(2024, 8, 14, 14, 0, 0).unwrap(), None),
            Event::timed("tomorrow", "x", Utc.with_ymd_and_hms(2024, 8, 15, 16, 0, 0).unwrap(), None),
            Event::all_day("holiday", "Obon", NaiveDate::from_ymd_opt(2024, 8, 15).unwrap()),
        ];
        let source = Arc::new(InMemorySource::with_events(Tokyo, events));
        let job = DailyDigestJob::new(source, Arc::new(ManualClock::new(now)), Tokyo);

        let window = job.window().unwrap();
        assert_eq!(window.from(), Utc.with_ymd_and_hms(2024, 8, 14, 15, 0, 0).unwrap());
        assert_eq!(window.to(), Utc.with_ymd_and_hms(2024, 8, 15, 15, 0, 0).unwrap());

        let ids: Vec<_> = job.run().await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["holiday", "early", "morning"]);
    }

    #[tokio::test]
    async fn test_digest_is_repeatable() {
        let now = Utc.with_ymd_and_hms(2024, 8, 14, 23, 0, 0).unwrap();
        let event = Event::timed("e", "x", Utc.with_ymd_and_hms(2024, 8, 15, 0, 0, 0).unwrap(), None);
        let source = Arc::new(InMemorySource::with_events(Tokyo, vec![event]));
        let job = DailyDigestJob::new(source, Arc::new(ManualClock::new(now)), Tokyo);
        assert_eq!(job.run().await.unwrap().len(), 1);
        assert_eq!(job.run().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_empty_digest() {
        let now = Utc.with_ymd_and_hms(2024, 8, 14, 23, 0, 0).unwrap();
        let source = Arc::new(InMemorySource::new(Tokyo));
        let job = DailyDigestJob::new(source, Arc::new(ManualClock::new(now)), Tokyo);
        let sink = RecordingSink::default();

        assert_eq!(job.send(&sink).await.unwrap(), 0);
        let sent = sink.sent.lock().unwrap().clone();
        assert_eq!(sent, vec![Notification::digest(NaiveDate::from_ymd_opt(2024, 8, 15).unwrap(), vec![])]);
    }
}
