//! # CalBot Scheduler
//!
//! Reminder engine, daily digest and notification routing.
//!
//! ## Architecture
//! ```text
//! ReminderScheduler (tokio task, watch-cancelled sleep)
//!   └── ReminderLoop::tick every 60s
//!         ├── EventSource::list_events([now+9m, now+11m])
//!         ├── NotificationDeduplicator: skip already-reminded ids
//!         └── NotifyRouter
//!               ├── Discord (priority 1)
//!               └── Webhook (priority 2)
//! DailyDigestJob: local midnight .. +1 day, no dedup
//! ```

pub mod backoff;
pub mod dedup;
pub mod digest;
pub mod engine;
pub mod notify;

pub use backoff::Backoff;
pub use dedup::NotificationDeduplicator;
pub use digest::DailyDigestJob;
pub use engine::{ReminderLoop, ReminderScheduler, ReminderSettings, TickReport};
pub use notify::NotifyRouter;
