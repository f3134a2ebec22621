//! GoogleCalendar against a mocked Calendar v3 API.

use calbot_calendar::{parser, GoogleCalendar};
use calbot_core::config::CalendarConfig;
use calbot_core::error::CalBotError;
use calbot_core::traits::EventSource;
use calbot_core::types::{EventTiming, Window};
use chrono::{Duration, TimeZone, Utc};
use chrono_tz::Asia::Tokyo;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn calendar(server: &MockServer) -> GoogleCalendar {
    let config = CalendarConfig {
        api_base: server.uri(),
        calendar_id: "primary".into(),
        access_token: Some("test-token".into()),
        ..Default::default()
    };
    GoogleCalendar::new(&config).unwrap()
}

const EVENTS_PATH: &str = "/calendars/primary/events";

#[tokio::test]
async fn test_list_events_sends_window_and_drops_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("timeMin", "2024-08-15T01:09:00Z"))
        .and(query_param("timeMax", "2024-08-15T01:11:00Z"))
        .and(query_param("singleEvents", "true"))
        .and(query_param("orderBy", "startTime"))
        .and(query_param("maxResults", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "e1",
                    "status": "confirmed",
                    "summary": "会議",
                    "start": { "dateTime": "2024-08-15T10:10:00+09:00" },
                    "end": { "dateTime": "2024-08-15T11:00:00+09:00" }
                },
                {
                    "id": "e2",
                    "status": "cancelled",
                    "summary": "Gone",
                    "start": { "dateTime": "2024-08-15T10:10:00+09:00" }
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let now = Utc.with_ymd_and_hms(2024, 8, 15, 1, 0, 0).unwrap();
    let events = calendar(&server).list_for_reminder_at(now, 10, 1).await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, "e1");
    assert_eq!(events[0].title, "会議");
    assert_eq!(events[0].starts_at(&Tokyo), Utc.with_ymd_and_hms(2024, 8, 15, 1, 10, 0).unwrap());
}

#[tokio::test]
async fn test_empty_response_is_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let now = Utc.with_ymd_and_hms(2024, 8, 15, 1, 0, 0).unwrap();
    let window = Window::starting_at(now, Duration::hours(1)).unwrap();
    assert!(calendar(&server).list_events(&window).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let cases = [
        (404, "not_found"),
        (403, "forbidden"),
        (401, "auth"),
        (429, "rate"),
        (500, "source"),
    ];
    for (status, kind) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(EVENTS_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let window = Window::starting_at(Utc::now(), Duration::hours(1)).unwrap();
        let err = calendar(&server).list_events(&window).await.unwrap_err();
        assert!(err.is_source_error(), "{status} should be a source error");
        let matched = match kind {
            "not_found" => matches!(err, CalBotError::SourceNotFound(_)),
            "forbidden" => matches!(err, CalBotError::SourceForbidden(_)),
            "auth" => matches!(err, CalBotError::AuthFailed(_)),
            "rate" => matches!(err, CalBotError::RateLimited(_)),
            _ => matches!(err, CalBotError::Source(_)),
        };
        assert!(matched, "{status} mapped to {err:?}");
    }
}

#[tokio::test]
async fn test_create_event_posts_zoned_times() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(body_partial_json(json!({
            "summary": "会議",
            "start": { "dateTime": "2024-08-15T10:00:00+09:00", "timeZone": "Asia/Tokyo" },
            "end": { "dateTime": "2024-08-15T11:00:00+09:00", "timeZone": "Asia/Tokyo" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "created-1",
            "summary": "会議",
            "start": { "dateTime": "2024-08-15T10:00:00+09:00", "timeZone": "Asia/Tokyo" },
            "end": { "dateTime": "2024-08-15T11:00:00+09:00", "timeZone": "Asia/Tokyo" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let draft = parser::parse("2024-08-15 10:00-11:00 会議", 2024, Tokyo).unwrap();
    let event = calendar(&server).create_event(&draft).await.unwrap();

    assert_eq!(event.id, "created-1");
    assert!(matches!(event.timing, EventTiming::Timed { .. }));
}

#[tokio::test]
async fn test_delete_event_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{EVENTS_PATH}/abc123")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    calendar(&server).delete_event("abc123").await.unwrap();
}

#[tokio::test]
async fn test_check_connection_reports_calendar() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calendars/primary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": "Team",
            "timeZone": "Asia/Tokyo"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(query_param("maxResults", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "d1", "summary": "Holiday", "start": { "date": "2024-08-16" }, "end": { "date": "2024-08-17" } }
            ]
        })))
        .mount(&server)
        .await;

    let now = Utc.with_ymd_and_hms(2024, 8, 15, 1, 0, 0).unwrap();
    let report = calendar(&server).check_connection(now).await.unwrap();

    assert_eq!(report.summary.as_deref(), Some("Team"));
    assert_eq!(report.time_zone.as_deref(), Some("Asia/Tokyo"));
    assert_eq!(report.upcoming.len(), 1);
    assert!(report.upcoming[0].timing.is_all_day());
}

#[tokio::test]
async fn test_check_connection_not_shared() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calendars/primary"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = calendar(&server).check_connection(Utc::now()).await.unwrap_err();
    assert!(matches!(err, CalBotError::SourceForbidden(_)));
}
