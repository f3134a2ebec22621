//! Notification sink trait: where reminders and digests go.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Notification;

/// Delivers notifications to a chat channel or similar destination.
/// Failures are reported as dispatch errors; callers never retry.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sink name (e.g., "discord", "webhook").
    fn name(&self) -> &str;

    async fn deliver(&self, notification: &Notification) -> Result<()>;
}
