//! # CalBot Calendar
//! Event sources and the free-text event parser.

pub mod google;
pub mod memory;
pub mod parser;

pub use google::{ConnectionReport, GoogleCalendar};
pub use memory::InMemorySource;

use calbot_core::config::CalendarConfig;
use calbot_core::error::Result;
use calbot_core::traits::EventSource;
use chrono_tz::Tz;

/// Create an event source from configuration.
///
/// `dry_run` swaps the remote calendar for an empty in-memory one.
pub fn create_source(config: &CalendarConfig, zone: Tz, dry_run: bool) -> Result<Box<dyn EventSource>> {
    if dry_run {
        return Ok(Box::new(InMemorySource::new(zone)));
    }
    Ok(Box::new(GoogleCalendar::new(config)?))
}
