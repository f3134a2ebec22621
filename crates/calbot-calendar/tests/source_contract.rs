//! Provided `EventSource` operations, exercised through the in-memory source.

use calbot_calendar::{parser, InMemorySource};
use calbot_core::error::CalBotError;
use calbot_core::traits::EventSource;
use calbot_core::types::{Event, Window};
use chrono::{Duration, TimeZone, Utc};
use chrono_tz::Asia::Tokyo;

#[tokio::test]
async fn test_list_for_reminder_requests_exact_window() {
    let source = InMemorySource::new(Tokyo);
    let now = Utc.with_ymd_and_hms(2024, 8, 15, 1, 0, 0).unwrap();

    source.list_for_reminder_at(now, 10, 1).await.unwrap();

    let queries = source.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].from(), now + Duration::minutes(9));
    assert_eq!(queries[0].to(), now + Duration::minutes(11));
}

#[tokio::test]
async fn test_list_for_reminder_uses_wall_clock() {
    let source = InMemorySource::new(Tokyo);

    let before = Utc::now();
    source.list_for_reminder(10).await.unwrap();
    let after = Utc::now();

    let queries = source.queries();
    assert_eq!(queries.len(), 1);
    let window = queries[0];
    assert_eq!(window.to() - window.from(), Duration::minutes(2));
    assert!(window.from() >= before + Duration::minutes(9));
    assert!(window.from() <= after + Duration::minutes(9));
}

#[tokio::test]
async fn test_list_for_reminder_rejects_overflowing_lookahead() {
    let source = InMemorySource::new(Tokyo);
    let err = source.list_for_reminder(i64::MAX).await.unwrap_err();
    assert!(matches!(err, CalBotError::InvalidWindow(_)));
    assert!(source.queries().is_empty());
}

#[tokio::test]
async fn test_delete_by_title_searches_given_days() {
    let now = Utc::now();
    let source = InMemorySource::with_events(Tokyo, vec![
        Event::timed("far", "Review", now + Duration::days(31), None),
        Event::timed("near", "Review", now + Duration::days(29), None),
    ]);

    assert!(source.delete_by_title("review", 30).await.unwrap());
    let ids: Vec<_> = source.events().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["far"]);

    assert!(!source.delete_by_title("review", 30).await.unwrap());
    assert_eq!(source.events().len(), 1);
}

#[tokio::test]
async fn test_delete_by_title_removes_first_match_only() {
    let now = Utc.with_ymd_and_hms(2024, 8, 15, 1, 0, 0).unwrap();
    let source = InMemorySource::with_events(Tokyo, vec![
        Event::timed("later", "standup", now + Duration::days(2), None),
        Event::timed("sooner", "Standup", now + Duration::days(1), None),
        Event::timed("other", "Retro", now + Duration::days(1), None),
    ]);
    let window = Window::starting_at(now, Duration::days(30)).unwrap();

    assert!(source.delete_by_title_within("STANDUP", &window).await.unwrap());
    let ids: Vec<_> = source.events().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["later", "other"]);

    assert!(source.delete_by_title_within("standup", &window).await.unwrap());
    assert!(!source.delete_by_title_within("standup", &window).await.unwrap());
    assert_eq!(source.events().len(), 1);
}

#[tokio::test]
async fn test_delete_by_title_ignores_events_outside_window() {
    let now = Utc.with_ymd_and_hms(2024, 8, 15, 1, 0, 0).unwrap();
    let source = InMemorySource::with_events(Tokyo, vec![
        Event::timed("far", "Standup", now + Duration::days(45), None),
    ]);
    let window = Window::starting_at(now, Duration::days(30)).unwrap();

    assert!(!source.delete_by_title_within("Standup", &window).await.unwrap());
    assert_eq!(source.events().len(), 1);
}

#[tokio::test]
async fn test_created_event_is_listed_upcoming() {
    let now = Utc.with_ymd_and_hms(2024, 8, 15, 0, 0, 0).unwrap();
    let source = InMemorySource::new(Tokyo);
    let draft = parser::parse("08/16 10:00-11:00 Planning", 2024, Tokyo).unwrap();

    let created = source.create_event(&draft).await.unwrap();
    assert_eq!(created.title, "Planning");

    let upcoming = source.list_upcoming(now, 7).await.unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].id, created.id);
    assert_eq!(upcoming[0].starts_at(&Tokyo), Utc.with_ymd_and_hms(2024, 8, 16, 1, 0, 0).unwrap());
}
