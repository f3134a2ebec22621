//! Reminder engine: the polling loop that turns upcoming events into
//! exactly-once reminders.

use std::sync::Arc;
use std::time::Duration;

use calbot_core::config::CalBotConfig;
use calbot_core::error::{CalBotError, Result};
use calbot_core::traits::{Clock, EventSource, NotificationSink};
use calbot_core::types::{Event, EventTiming, Notification, Window};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::backoff::Backoff;
use crate::dedup::NotificationDeduplicator;

/// Timing knobs for the reminder loop.
#[derive(Debug, Clone)]
pub struct ReminderSettings {
    /// How far ahead of an event's start the reminder goes out.
    pub lookahead_minutes: i64,
    /// Slack on each side of the lookahead instant.
    pub tolerance_minutes: i64,
    pub tick: Duration,
    pub max_backoff: Duration,
    /// Bound on each source query and each delivery.
    pub call_timeout: Duration,
    /// Widen the query window over ticks that were delayed or failed.
    pub catch_up: bool,
}

impl ReminderSettings {
    pub fn from_config(config: &CalBotConfig) -> Self {
        Self {
            lookahead_minutes: config.reminder.lookahead_minutes,
            tolerance_minutes: config.reminder.tolerance_minutes,
            tick: Duration::from_secs(config.reminder.tick_secs),
            max_backoff: Duration::from_secs(config.reminder.max_backoff_secs),
            call_timeout: Duration::from_secs(config.calendar.call_timeout_secs),
            catch_up: config.reminder.catch_up,
        }
    }
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self::from_config(&CalBotConfig::default())
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub window: Window,
    /// Events returned by the source.
    pub found: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Already reminded, all-day, or outside the window.
    pub skipped: usize,
    /// Dedup entries dropped by compaction.
    pub evicted: usize,
}

/// One reminder pass over the calendar, plus the state carried between
/// passes. Owns the dedup store.
pub struct ReminderLoop {
    source: Arc<dyn EventSource>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    settings: ReminderSettings,
    dedup: NotificationDeduplicator,
    last_window_end: Option<DateTime<Utc>>,
}

impl ReminderLoop {
    pub fn new(
        source: Arc<dyn EventSource>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        settings: ReminderSettings,
        dedup: NotificationDeduplicator,
    ) -> Self {
        Self { source, sink, clock, settings, dedup, last_window_end: None }
    }

    pub fn dedup(&self) -> &NotificationDeduplicator {
        &self.dedup
    }

    /// The reminder slot for `now`, widened back over missed ticks when
    /// catch-up is on. `None` for the widening means the plain slot.
    fn query_window(&self, now: DateTime<Utc>) -> Result<(Window, Option<Window>)> {
        let slot = Window::for_reminder(now, self.settings.lookahead_minutes, self.settings.tolerance_minutes)?;
        match self.last_window_end {
            Some(previous) if self.settings.catch_up && previous < slot.from() => {
                let from = previous.max(now);
                tracing::info!("Catching up on events starting from {}", from.to_rfc3339());
                let widened = slot.extend_back_to(from);
                Ok((widened, Some(widened)))
            }
            _ => Ok((slot, None)),
        }
    }

    async fn query(&self, now: DateTime<Utc>, widened: Option<Window>) -> Result<Vec<Event>> {
        match widened {
            Some(window) => self.source.list_events(&window).await,
            None => {
                self.source
                    .list_for_reminder_at(now, self.settings.lookahead_minutes, self.settings.tolerance_minutes)
                    .await
            }
        }
    }

    /// Query the source, remind every new timed event starting inside the
    /// window, then compact the dedup store.
    ///
    /// A failed or timed-out delivery still marks the event: reminders are
    /// at-most-once.
    pub async fn tick(&mut self) -> Result<TickReport> {
        let now = self.clock.now();
        let (window, widened) = self.query_window(now)?;
        tracing::debug!(
            "Reminder tick: {} .. {}",
            window.from().to_rfc3339(),
            window.to().to_rfc3339()
        );

        let events = tokio::time::timeout(self.settings.call_timeout, self.query(now, widened))
            .await
            .map_err(|_| CalBotError::Timeout(format!(
                "{} did not answer within {}s",
                self.source.name(),
                self.settings.call_timeout.as_secs()
            )))??;
        self.last_window_end = Some(window.to());

        let mut report = TickReport {
            window,
            found: events.len(),
            delivered: 0,
            failed: 0,
            skipped: 0,
            evicted: 0,
        };

        for event in events {
            let EventTiming::Timed { start, .. } = event.timing else {
                report.skipped += 1;
                continue;
            };
            if !window.contains(start) || !self.dedup.should_notify(&event.id) {
                report.skipped += 1;
                continue;
            }

            let id = event.id.clone();
            let minutes_ahead = ((start - now).num_seconds() + 30).div_euclid(60).max(0);
            let notification = Notification::reminder(event, minutes_ahead);

            match tokio::time::timeout(self.settings.call_timeout, self.sink.deliver(&notification)).await {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    tracing::info!("Sent {notification} via {}", self.sink.name());
                }
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!("Failed to send {notification}: {e}");
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::warn!("Timed out sending {notification}");
                }
            }
            self.dedup.mark_notified(&id, start, now);
        }

        report.evicted = self.dedup.maybe_compact(now);
        Ok(report)
    }

    /// Tick until `stop` flips. The inter-tick sleep is interrupted by a
    /// stop request; a running tick is not.
    async fn run(mut self, mut stop: watch::Receiver<bool>) -> Self {
        tracing::info!(
            "Reminder loop started: {} -> {} every {}s",
            self.source.name(),
            self.sink.name(),
            self.settings.tick.as_secs()
        );
        let mut backoff = Backoff::new(self.settings.tick, self.settings.max_backoff);

        loop {
            if *stop.borrow() {
                break;
            }

            match self.tick().await {
                Ok(report) => {
                    backoff.reset();
                    if report.delivered + report.failed > 0 {
                        tracing::debug!(
                            "Tick done: {} found, {} sent, {} failed",
                            report.found, report.delivered, report.failed
                        );
                    }
                }
                Err(e) => {
                    tracing::error!("Reminder tick failed: {e}");
                    if e.is_source_error() {
                        backoff.record_failure();
                        tracing::warn!(
                            "{} consecutive source errors, next tick in {}s",
                            backoff.failures(),
                            backoff.delay().as_secs()
                        );
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(backoff.delay()) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Reminder loop stopped");
        self
    }
}

struct Running {
    stop: watch::Sender<bool>,
    handle: JoinHandle<ReminderLoop>,
}

/// Runs a [`ReminderLoop`] on its own task.
///
/// `Stopped -> Running -> Stopped`; after `stop()` and `wait()` the same
/// loop, dedup state included, can be started again.
pub struct ReminderScheduler {
    idle: Option<ReminderLoop>,
    running: Option<Running>,
}

impl ReminderScheduler {
    pub fn new(reminder_loop: ReminderLoop) -> Self {
        Self { idle: Some(reminder_loop), running: None }
    }

    /// Spawn the loop. Returns `false` if it is already running.
    pub fn start(&mut self) -> bool {
        if self.running.is_some() {
            return false;
        }
        let Some(reminder_loop) = self.idle.take() else {
            return false;
        };

        let (stop, rx) = watch::channel(false);
        let handle = tokio::spawn(reminder_loop.run(rx));
        self.running = Some(Running { stop, handle });
        true
    }

    /// Ask the loop to exit at the next tick boundary.
    pub fn stop(&self) {
        if let Some(running) = &self.running {
            let _ = running.stop.send(true);
        }
    }

    /// Wait for the loop task to finish.
    pub async fn wait(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        let reminder_loop = running.handle.await
            .map_err(|e| CalBotError::Other(format!("Reminder task failed: {e}")))?;
        self.idle = Some(reminder_loop);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.handle.is_finished())
    }

    /// The loop, when not running.
    pub fn reminder_loop(&self) -> Option<&ReminderLoop> {
        self.idle.as_ref()
    }
}
