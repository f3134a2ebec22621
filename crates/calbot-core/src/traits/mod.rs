//! Trait seams between the scheduling core and its I/O collaborators.

pub mod clock;
pub mod sink;
pub mod source;

pub use clock::{Clock, ManualClock, SystemClock};
pub use sink::NotificationSink;
pub use source::EventSource;
