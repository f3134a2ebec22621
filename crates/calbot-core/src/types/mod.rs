//! Domain types shared across CalBot crates.

pub mod event;
pub mod notification;

pub use event::{Event, EventDraft, EventTiming, Window, local_midnight};
pub use notification::Notification;
