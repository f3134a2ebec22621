//! Notification routing: pick the best channel to reach the user.
//!
//! Sinks are tried in priority order (lowest number first); the first one
//! that accepts the notification wins.

use async_trait::async_trait;
use calbot_core::error::{CalBotError, Result};
use calbot_core::traits::NotificationSink;
use calbot_core::types::Notification;

struct Route {
    priority: u8,
    sink: Box<dyn NotificationSink>,
}

#[derive(Default)]
pub struct NotifyRouter {
    routes: Vec<Route>,
}

impl NotifyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink. Equal priorities keep insertion order.
    pub fn add(&mut self, priority: u8, sink: Box<dyn NotificationSink>) {
        self.routes.push(Route { priority, sink });
        self.routes.sort_by_key(|r| r.priority);
    }

    pub fn with(mut self, priority: u8, sink: Box<dyn NotificationSink>) -> Self {
        self.add(priority, sink);
        self
    }

    /// Sink names in delivery order.
    pub fn names(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.sink.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[async_trait]
impl NotificationSink for NotifyRouter {
    fn name(&self) -> &str { "router" }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let mut last_error = None;
        for route in &self.routes {
            match route.sink.deliver(notification).await {
                Ok(()) => {
                    tracing::debug!("{notification} delivered via {}", route.sink.name());
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("{} could not deliver {notification}: {e}", route.sink.name());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CalBotError::dispatch("no sinks")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calbot_core::types::Event;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        name: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl CountingSink {
        fn boxed(name: &'static str, fail: bool) -> (Box<dyn NotificationSink>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (Box::new(Self { name, fail, calls: calls.clone() }), calls)
        }
    }

    #[async_trait]
    impl NotificationSink for CountingSink {
        fn name(&self) -> &str { self.name }

        async fn deliver(&self, _notification: &Notification) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CalBotError::dispatch(format!("{} down", self.name)));
            }
            Ok(())
        }
    }

    fn reminder() -> Notification {
        let start = Utc.with_ymd_and_hms(2024, 8, 15, 1, 10, 0).unwrap();
        Notification::reminder(Event::timed("e1", "会議", start, None), 10)
    }

    #[tokio::test]
    async fn test_priority_order_and_fallback() {
        let (webhook, webhook_calls) = CountingSink::boxed("webhook", false);
        let (discord, discord_calls) = CountingSink::boxed("discord", true);
        let router = NotifyRouter::new().with(2, webhook).with(1, discord);

        assert_eq!(router.names(), vec!["discord", "webhook"]);
        router.deliver(&reminder()).await.unwrap();
        assert_eq!(discord_calls.load(Ordering::SeqCst), 1);
        assert_eq!(webhook_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_success_stops() {
        let (first, first_calls) = CountingSink::boxed("first", false);
        let (second, second_calls) = CountingSink::boxed("second", false);
        let router = NotifyRouter::new().with(1, first).with(2, second);

        router.deliver(&reminder()).await.unwrap();
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_failing_returns_last_error() {
        let (a, _) = CountingSink::boxed("a", true);
        let (b, _) = CountingSink::boxed("b", true);
        let router = NotifyRouter::new().with(1, a).with(2, b);

        let err = router.deliver(&reminder()).await.unwrap_err();
        assert_eq!(err.to_string(), CalBotError::dispatch("b down").to_string());
    }

    #[tokio::test]
    async fn test_empty_router() {
        let router = NotifyRouter::new();
        assert!(router.is_empty());
        let err = router.deliver(&reminder()).await.unwrap_err();
        assert!(err.is_dispatch_error());
    }
}
