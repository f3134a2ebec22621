//! Log-only sink for dry runs.

use async_trait::async_trait;
use calbot_core::error::Result;
use calbot_core::traits::NotificationSink;
use calbot_core::types::Notification;
use chrono_tz::Tz;

use crate::text;

pub struct LogSink {
    zone: Tz,
}

impl LogSink {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str { "log" }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        tracing::info!("[dry-run] {notification}\n{}", text::render(notification, &self.zone));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::Asia::Tokyo;

    #[tokio::test]
    async fn test_log_sink_always_accepts() {
        let sink = LogSink::new(Tokyo);
        let digest = Notification::digest(NaiveDate::from_ymd_opt(2024, 8, 15).unwrap(), vec![]);
        assert!(sink.deliver(&digest).await.is_ok());
    }
}
